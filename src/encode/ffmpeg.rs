use std::path::Path;
use std::process::{Command, Stdio};

use crate::audio::wav::write_wav;
use crate::audio::AudioSignal;
use crate::error::EncodeError;

/// Compresses PCM into a container at a target bitrate.
pub trait Encoder: Send + Sync {
    fn encode(&self, signal: &AudioSignal, bitrate_kbps: u32) -> Result<Vec<u8>, EncodeError>;
}

/// Encoder that stages PCM as a WAV file and pipes the compressed stream
/// back from an `ffmpeg` child process.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    program: String,
    codec: String,
    format: String,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<String>, codec: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            codec: codec.into(),
            format: format.into(),
        }
    }

    /// Pick codec and muxer from an output file extension (MP3 when unknown).
    pub fn for_extension(program: impl Into<String>, extension: Option<&str>) -> Self {
        let (codec, format) = match extension.map(|e| e.to_ascii_lowercase()).as_deref() {
            Some("ogg") | Some("oga") => ("libvorbis", "ogg"),
            Some("opus") => ("libopus", "opus"),
            Some("aac") => ("aac", "adts"),
            Some("flac") => ("flac", "flac"),
            _ => ("libmp3lame", "mp3"),
        };
        Self::new(program, codec, format)
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn codec(&self) -> &str {
        &self.codec
    }

    fn args(&self, input: &Path, bitrate_kbps: u32) -> Vec<String> {
        vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(), "error".into(),
            "-i".into(), input.to_string_lossy().into_owned(),
            "-c:a".into(), self.codec.clone(),
            "-b:a".into(), format!("{}k", bitrate_kbps),
            "-f".into(), self.format.clone(),
            "pipe:1".into(),
        ]
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg", "libmp3lame", "mp3")
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&self, signal: &AudioSignal, bitrate_kbps: u32) -> Result<Vec<u8>, EncodeError> {
        let staged = tempfile::Builder::new()
            .prefix("broom-encode-")
            .suffix(".wav")
            .tempfile()
            .map_err(EncodeError::Staging)?;
        write_wav(staged.path(), signal)?;

        let output = Command::new(&self.program)
            .args(self.args(staged.path(), bitrate_kbps))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| EncodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EncodeError::Failed {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        if output.stdout.is_empty() {
            return Err(EncodeError::EmptyOutput);
        }

        log::info!(
            "FFmpeg encoding complete: {} bytes, codec={}, {} kbps",
            output.stdout.len(),
            self.codec,
            bitrate_kbps
        );
        Ok(output.stdout)
    }
}
