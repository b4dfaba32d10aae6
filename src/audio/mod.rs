pub mod decode;
pub mod info;
pub mod signal;
pub mod wav;

pub use decode::{Decoder, SymphoniaDecoder};
pub use info::AudioFileInfo;
pub use signal::AudioSignal;
