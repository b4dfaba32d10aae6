mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use broom::analysis::{detect_fingerprint, detect_fingerprint_from, extract_features, extract_features_from};
use broom::audio::info::{format_duration, AudioFileInfo};
use broom::pipeline::{Intermediates, PipelineOptions, RemovalPipeline, RunState};
use broom::{Decoder, FeatureVector, FfmpegEncoder, FingerprintScore, PipelineError, SymphoniaDecoder};
use cli::{Cli, Command};
use config::Config;

#[derive(Serialize)]
struct AnalysisReport {
    file: AudioFileInfo,
    features: FeatureVector,
    fingerprint: FingerprintScore,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    let decoder = SymphoniaDecoder;
    match cli.command {
        Command::Analyze { input, json } => analyze(&decoder, &input, json),
        Command::Detect { input, json } => detect(&decoder, &input, json),
        Command::Clean { input, output, bitrate, keep_intermediates, report, ffmpeg } => {
            // Config values apply only when the CLI is at its default
            let ffmpeg = if ffmpeg == "ffmpeg" { cfg.encoder.ffmpeg.clone() } else { ffmpeg };
            let keep = keep_intermediates || cfg.pipeline.keep_intermediates;
            let output = output.unwrap_or_else(|| default_output(&input));
            clean(&decoder, &cfg, &input, &output, bitrate, keep, &ffmpeg, report)
        }
    }
}

fn require_input(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(())
}

fn analyze(decoder: &dyn Decoder, input: &Path, json: bool) -> Result<()> {
    require_input(input)?;
    let signal = decoder
        .decode(input)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    let file = AudioFileInfo::new(input, &signal)
        .with_context(|| format!("Failed to stat {}", input.display()))?;

    let report = AnalysisReport {
        file,
        features: extract_features_from(&signal),
        fingerprint: detect_fingerprint_from(&signal),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let f = &report.file;
    println!("{}", f.name);
    println!("  Size:          {:.2} MB", f.size_bytes as f64 / (1024.0 * 1024.0));
    println!("  Duration:      {}", format_duration(f.duration_secs));
    match f.estimated_bitrate_kbps {
        Some(kbps) => println!("  Bitrate:       ~{} kbps", kbps),
        None => println!("  Bitrate:       unknown"),
    }
    println!("  Format:        {} Hz, {} ch, {} bit", f.sample_rate, f.channels, f.bits_per_sample);
    print_features(&report.features);
    print_score(&report.fingerprint);
    Ok(())
}

fn detect(decoder: &dyn Decoder, input: &Path, json: bool) -> Result<()> {
    require_input(input)?;
    let score = detect_fingerprint(decoder, input);
    if json {
        println!("{}", serde_json::to_string_pretty(&score)?);
    } else {
        print_score(&score);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn clean(
    decoder: &dyn Decoder,
    cfg: &Config,
    input: &Path,
    output: &Path,
    bitrate: Option<u32>,
    keep_intermediates: bool,
    ffmpeg: &str,
    report: bool,
) -> Result<()> {
    require_input(input)?;

    let extension = output.extension().and_then(|e| e.to_str());
    let mut encoder = FfmpegEncoder::for_extension(ffmpeg, extension);
    if let Some(codec) = &cfg.encoder.codec {
        encoder = encoder.with_codec(codec.clone());
    }

    let dir = cfg
        .pipeline
        .intermediate_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    let options = PipelineOptions {
        intermediates: Intermediates::OnDisk { dir, keep: keep_intermediates },
        bitrate_kbps: bitrate,
        fallback_bitrate_kbps: cfg.encoder.fallback_bitrate_kbps,
    };

    log::info!("broom - spectral fingerprint removal");
    log::info!("Input: {}", input.display());
    log::info!("Output: {} (codec {})", output.display(), encoder.codec());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} [{elapsed_precise}] {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));

    let pipeline = RemovalPipeline::new(decoder, &encoder, options);
    let result = pipeline.run(input, output, &mut |state: RunState| spinner.set_message(state.to_string()));

    let info = match result {
        Ok(info) => {
            spinner.finish_with_message("done");
            info
        }
        Err(PipelineError::Encode { fallback, source }) => {
            spinner.abandon_with_message("encode failed");
            eprintln!("Processed audio saved as WAV: {}", fallback.display());
            return Err(anyhow::Error::new(source).context(format!("Failed to encode {}", output.display())));
        }
        Err(err) => {
            spinner.abandon_with_message("failed");
            return Err(err).with_context(|| format!("Failed to clean {}", input.display()));
        }
    };

    println!("Cleaned: {}", info.output_path.display());
    println!(
        "  {} Hz, {} ch, {} kbps, {}",
        info.final_sample_rate,
        info.final_channels,
        info.final_bitrate_kbps,
        format_duration(info.final_duration_seconds)
    );

    if report {
        let before = (extract_features(decoder, input), detect_fingerprint(decoder, input));
        let after = (extract_features(decoder, output), detect_fingerprint(decoder, output));
        print_comparison(&before, &after);
    }
    Ok(())
}

/// `<dir>/<stem>_clean.mp3` next to the input.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    input.with_file_name(format!("{stem}_clean.mp3"))
}

fn print_features(f: &FeatureVector) {
    println!("  RMS:           {:.4}", f.rms);
    println!("  Zero crossing: {:.1} /s", f.zcr);
    println!("  Centroid:      {:.0} Hz", f.spectral_centroid_hz);
    println!("  HF energy:     {:.1}%", f.high_freq_energy_ratio * 100.0);
    println!("  Peak density:  {:.2} /s", f.peak_density_per_sec);
}

fn print_score(s: &FingerprintScore) {
    let verdict = if s.likely { "likely fingerprinted" } else { "no fingerprint detected" };
    println!("  Fingerprint:   {:.3} ({})", s.score, verdict);
}

fn print_comparison(before: &(FeatureVector, FingerprintScore), after: &(FeatureVector, FingerprintScore)) {
    let rows = [
        ("RMS", before.0.rms, after.0.rms),
        ("Zero crossing /s", before.0.zcr, after.0.zcr),
        ("Centroid Hz", before.0.spectral_centroid_hz, after.0.spectral_centroid_hz),
        ("HF energy ratio", before.0.high_freq_energy_ratio, after.0.high_freq_energy_ratio),
        ("Peak density /s", before.0.peak_density_per_sec, after.0.peak_density_per_sec),
        ("Fingerprint score", before.1.score, after.1.score),
    ];
    println!("{:<20} {:>12} {:>12}", "", "before", "after");
    for (label, b, a) in rows {
        println!("{:<20} {:>12.4} {:>12.4}", label, b, a);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(default_output(Path::new("/music/song.flac")), PathBuf::from("/music/song_clean.mp3"));
        assert_eq!(default_output(Path::new("take.wav")), PathBuf::from("take_clean.mp3"));
    }
}
