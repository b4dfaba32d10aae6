//! Spectral analysis and fingerprint-band removal for decoded audio.
//!
//! The analysis side (`analysis`) scores how synthetic a signal looks and
//! never fails; the transform side (`pipeline`) rewrites the spectrum in two
//! STFT passes and reports every failure as a typed error.

pub mod analysis;
pub mod audio;
pub mod dsp;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod spectral;

pub use analysis::{detect_fingerprint, extract_features, FeatureVector, FingerprintScore};
pub use audio::{AudioSignal, Decoder, SymphoniaDecoder};
pub use encode::{Encoder, FfmpegEncoder};
pub use error::{DecodeError, EncodeError, FftError, PipelineError};
pub use pipeline::{PipelineOptions, RemovalPipeline, ResultInfo, RunState};
