pub mod ffmpeg;

pub use ffmpeg::{Encoder, FfmpegEncoder};
