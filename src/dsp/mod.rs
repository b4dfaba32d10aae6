pub mod fft;
pub mod framer;
pub mod window;
