use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FftError {
    #[error("FFT buffer length {len} is not a power of two")]
    SizeError { len: usize },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open audio file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to probe audio format: {0}")]
    Probe(#[source] symphonia::core::errors::Error),
    #[error("no audio tracks found")]
    NoTrack,
    #[error("unknown sample rate")]
    UnknownSampleRate,
    #[error("failed to create audio decoder: {0}")]
    Codec(#[source] symphonia::core::errors::Error),
    #[error("failed to read audio packet: {0}")]
    Packet(#[source] symphonia::core::errors::Error),
    #[error("failed to read WAV data")]
    Wav(#[from] hound::Error),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to spawn {program}. Is it installed?")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encoder exited with error:\n{stderr}")]
    Failed { stderr: String },
    #[error("encoder produced no output")]
    EmptyOutput,
    #[error("failed to stage PCM for the encoder")]
    Staging(#[source] std::io::Error),
    #[error("failed to write staging WAV")]
    Wav(#[from] hound::Error),
}

/// Failures of the destructive removal pipeline. Always surfaced to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no audio samples in {0}")]
    NoSamples(PathBuf),
    #[error("failed to decode input: {0}")]
    Decode(#[from] DecodeError),
    #[error("encoding failed, processed audio saved to {fallback}")]
    Encode {
        fallback: PathBuf,
        #[source]
        source: EncodeError,
    },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("intermediate WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error(transparent)]
    Fft(#[from] FftError),
}

impl PipelineError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
