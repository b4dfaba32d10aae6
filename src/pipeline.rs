//! Two-pass fingerprint removal: decode, conservative pass, aggressive pass,
//! encode.
//!
//! The passes are pure functions over in-memory signals. When intermediates
//! are on disk, Pass 2 reads Pass 1's WAV back, so its input carries the same
//! bit-depth quantization a file hand-off would.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::audio::info::estimate_bitrate_kbps;
use crate::audio::wav::{read_wav, write_wav};
use crate::audio::{AudioSignal, Decoder};
use crate::encode::Encoder;
use crate::error::{FftError, PipelineError, PipelineResult};
use crate::spectral::{aggressive_pass, conservative_pass};

/// Bitrate used when the input's bitrate cannot be estimated.
pub const DEFAULT_BITRATE_KBPS: u32 = 192;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Decoding,
    Pass1Processing,
    Pass1Written,
    Pass2Processing,
    Pass2Written,
    Encoding,
    Done,
    EncodeFallback,
}

impl RunState {
    /// Runs only move forward, one stage at a time.
    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Decoding)
                | (Decoding, Pass1Processing)
                | (Pass1Processing, Pass1Written)
                | (Pass1Written, Pass2Processing)
                | (Pass2Processing, Pass2Written)
                | (Pass2Written, Encoding)
                | (Encoding, Done)
                | (Encoding, EncodeFallback)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::EncodeFallback)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Idle => "idle",
            RunState::Decoding => "decoding",
            RunState::Pass1Processing => "pass 1: attenuating bands",
            RunState::Pass1Written => "pass 1 written",
            RunState::Pass2Processing => "pass 2: noise floor and jitter",
            RunState::Pass2Written => "pass 2 written",
            RunState::Encoding => "encoding",
            RunState::Done => "done",
            RunState::EncodeFallback => "encode failed, kept WAV",
        };
        f.write_str(label)
    }
}

/// Facts about the file a successful run produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultInfo {
    pub output_path: PathBuf,
    pub final_sample_rate: u32,
    pub final_channels: usize,
    pub final_bits_per_sample: u16,
    pub final_bitrate_kbps: u32,
    pub final_duration_seconds: f64,
}

/// Where the between-pass PCM lives.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Intermediates {
    #[default]
    InMemory,
    OnDisk {
        dir: PathBuf,
        keep: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOptions {
    pub intermediates: Intermediates,
    /// Forces the encode bitrate instead of the input's estimated one.
    pub bitrate_kbps: Option<u32>,
    pub fallback_bitrate_kbps: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            intermediates: Intermediates::InMemory,
            bitrate_kbps: None,
            fallback_bitrate_kbps: DEFAULT_BITRATE_KBPS,
        }
    }
}

/// Both edit passes back to back, entirely in memory.
pub fn process_signal(signal: &AudioSignal) -> Result<AudioSignal, FftError> {
    let first = conservative_pass(signal)?;
    aggressive_pass(&first)
}

/// Tracks one run's progress and reports each transition.
struct Run<'o> {
    state: RunState,
    observer: &'o mut dyn FnMut(RunState),
}

impl<'o> Run<'o> {
    fn new(observer: &'o mut dyn FnMut(RunState)) -> Self {
        Self {
            state: RunState::Idle,
            observer,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        log::debug!("Removal run: {:?} -> {:?}", self.state, next);
        self.state = next;
        (self.observer)(next);
    }
}

/// Temporary files removed when the run ends, unless asked to keep them.
struct TempFiles {
    paths: Vec<PathBuf>,
    keep: bool,
}

impl TempFiles {
    fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }
}

/// I/O failures on intermediate WAVs name the file; format errors stay `Wav`.
fn wav_error(action: &str, path: &Path, err: hound::Error) -> PipelineError {
    match err {
        hound::Error::IoError(source) => PipelineError::io(format!("failed to {} {}", action, path.display()), source),
        other => PipelineError::Wav(other),
    }
}

fn store_wav(path: &Path, signal: &AudioSignal) -> PipelineResult<()> {
    write_wav(path, signal).map_err(|e| wav_error("write", path, e))
}

/// Read an intermediate back. An intermediate with no frames is `NoSamples`.
fn reload_wav(path: &Path) -> PipelineResult<AudioSignal> {
    let signal = read_wav(path).map_err(|e| wav_error("read", path, e))?;
    if signal.is_empty() {
        return Err(PipelineError::NoSamples(path.to_path_buf()));
    }
    Ok(signal)
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        if self.keep {
            for path in &self.paths {
                log::info!("Kept intermediate {}", path.display());
            }
            return;
        }
        for path in &self.paths {
            if let Err(err) = std::fs::remove_file(path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to delete {}: {}", path.display(), err);
                }
            }
        }
    }
}

pub struct RemovalPipeline<'a> {
    decoder: &'a dyn Decoder,
    encoder: &'a dyn Encoder,
    options: PipelineOptions,
}

impl<'a> RemovalPipeline<'a> {
    pub fn new(decoder: &'a dyn Decoder, encoder: &'a dyn Encoder, options: PipelineOptions) -> Self {
        Self {
            decoder,
            encoder,
            options,
        }
    }

    pub fn remove_fingerprint(&self, input: &Path, output: &Path) -> PipelineResult<ResultInfo> {
        self.run(input, output, &mut |_| {})
    }

    /// Run the full pipeline, calling `observer` on every state change.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        observer: &mut dyn FnMut(RunState),
    ) -> PipelineResult<ResultInfo> {
        let mut run = Run::new(observer);
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let mut temps = TempFiles {
            paths: Vec::new(),
            keep: matches!(self.options.intermediates, Intermediates::OnDisk { keep: true, .. }),
        };

        run.advance(RunState::Decoding);
        let signal = self.decoder.decode(input)?;
        if signal.is_empty() {
            return Err(PipelineError::NoSamples(input.to_path_buf()));
        }
        let bitrate_kbps = self.target_bitrate(input, &signal);
        log::info!(
            "Removing fingerprints: {} ({} ch, {}Hz, target {} kbps)",
            input.display(),
            signal.channel_count(),
            signal.sample_rate,
            bitrate_kbps
        );

        run.advance(RunState::Pass1Processing);
        let first = conservative_pass(&signal)?;
        drop(signal);

        let first = match &self.options.intermediates {
            Intermediates::InMemory => first,
            Intermediates::OnDisk { dir, .. } => {
                let path = temps.track(dir.join(format!("{stem}_temp_clean.wav")));
                store_wav(&path, &first)?;
                reload_wav(&path)?
            }
        };
        run.advance(RunState::Pass1Written);

        run.advance(RunState::Pass2Processing);
        let last = aggressive_pass(&first)?;
        drop(first);

        let final_wav = match &self.options.intermediates {
            Intermediates::InMemory => None,
            Intermediates::OnDisk { dir, .. } => {
                let path = temps.track(dir.join(format!("{stem}_temp_clean.final.wav")));
                store_wav(&path, &last)?;
                Some(path)
            }
        };
        run.advance(RunState::Pass2Written);

        run.advance(RunState::Encoding);
        match self.encoder.encode(&last, bitrate_kbps) {
            Ok(bytes) => {
                std::fs::write(output, bytes)
                    .map_err(|e| PipelineError::io(format!("failed to write {}", output.display()), e))?;
                run.advance(RunState::Done);
                log::info!("Done! Output: {}", output.display());
                Ok(ResultInfo {
                    output_path: output.to_path_buf(),
                    final_sample_rate: last.sample_rate,
                    final_channels: last.channel_count(),
                    final_bits_per_sample: last.bits_per_sample,
                    final_bitrate_kbps: bitrate_kbps,
                    final_duration_seconds: last.duration_secs(),
                })
            }
            Err(source) => {
                let fallback = output.with_extension("wav");
                match &final_wav {
                    Some(path) => {
                        std::fs::copy(path, &fallback).map_err(|e| {
                            PipelineError::io(format!("failed to copy fallback WAV to {}", fallback.display()), e)
                        })?;
                    }
                    None => store_wav(&fallback, &last)?,
                }
                run.advance(RunState::EncodeFallback);
                log::warn!("Encoding failed, processed audio kept at {}", fallback.display());
                Err(PipelineError::Encode { fallback, source })
            }
        }
    }

    fn target_bitrate(&self, input: &Path, signal: &AudioSignal) -> u32 {
        if let Some(kbps) = self.options.bitrate_kbps {
            return kbps;
        }
        std::fs::metadata(input)
            .ok()
            .and_then(|m| estimate_bitrate_kbps(m.len(), signal.duration_secs()))
            .unwrap_or(self.options.fallback_bitrate_kbps)
    }
}
