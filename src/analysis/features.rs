//! Time and frequency-domain descriptors of a signal.
//!
//! All spectral metrics use Hamming-windowed full frames (no zero padding)
//! and are averaged across frames.

use rayon::prelude::*;
use serde::Serialize;

use crate::audio::AudioSignal;
use crate::dsp::fft::fft;
use crate::dsp::framer::{analysis_frame_starts, read_frame, FRAME_SIZE, HOP_SIZE};
use crate::dsp::window::hamming;
use crate::error::FftError;

/// Only the head of a file is analyzed.
pub const MAX_ANALYSIS_SECS: f64 = 30.0;
/// Floor added to every magnitude so logs and ratios stay finite.
pub const MAGNITUDE_FLOOR: f64 = 1e-12;
/// Lower edge of the "high frequency" region for the energy ratio.
pub const HIGH_FREQ_CUTOFF_HZ: f64 = 8000.0;
/// A bin counts as a peak when it exceeds this multiple of the frame mean.
const PEAK_MEAN_FACTOR: f64 = 3.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    pub rms: f64,
    /// Zero crossings per second.
    pub zcr: f64,
    pub spectral_centroid_hz: f64,
    pub high_freq_energy_ratio: f64,
    pub peak_density_per_sec: f64,
}

/// Magnitudes of the first `FRAME_SIZE / 2` bins of one windowed frame.
pub(crate) fn half_spectrum(samples: &[f32], pos: usize, window: &[f64]) -> Result<Vec<f64>, FftError> {
    let mut frame = read_frame(samples, pos, window);
    fft(&mut frame)?;
    Ok(frame[..FRAME_SIZE / 2]
        .iter()
        .map(|c| c.norm() + MAGNITUDE_FLOOR)
        .collect())
}

struct FrameMetrics {
    centroid: f64,
    high_ratio: f64,
    peaks: usize,
}

fn frame_metrics(mags: &[f64], bin_freq: f64) -> Option<FrameMetrics> {
    let total: f64 = mags.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let centroid = mags
        .iter()
        .enumerate()
        .map(|(k, &m)| k as f64 * bin_freq * m)
        .sum::<f64>()
        / total;

    let cutoff_bin = ((HIGH_FREQ_CUTOFF_HZ / bin_freq).round() as usize).min(mags.len() - 1);
    let high: f64 = mags[cutoff_bin..].iter().sum();

    let threshold = PEAK_MEAN_FACTOR * total / mags.len() as f64;
    let peaks = mags
        .windows(3)
        .filter(|w| w[1] > w[0] && w[1] > w[2] && w[1] > threshold)
        .count();

    Some(FrameMetrics {
        centroid,
        high_ratio: high / total,
        peaks,
    })
}

fn sign(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Features of a mono buffer. Only fails on an FFT size error.
pub fn compute_features(samples: &[f32], sample_rate: u32) -> Result<FeatureVector, FftError> {
    if samples.is_empty() || sample_rate == 0 {
        return Ok(FeatureVector::default());
    }

    let n = samples.len() as f64;
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum_sq / n).sqrt();

    let crossings = samples
        .windows(2)
        .filter(|w| sign(w[0]) != sign(w[1]))
        .count();
    let zcr = crossings as f64 / n * sample_rate as f64;

    let window = hamming(FRAME_SIZE);
    let bin_freq = sample_rate as f64 / FRAME_SIZE as f64;
    let starts: Vec<usize> = analysis_frame_starts(samples.len()).collect();

    let per_frame = starts
        .par_iter()
        .map(|&pos| half_spectrum(samples, pos, &window).map(|mags| frame_metrics(&mags, bin_freq)))
        .collect::<Result<Vec<_>, _>>()?;
    let metrics: Vec<FrameMetrics> = per_frame.into_iter().flatten().collect();

    let mean = |f: &dyn Fn(&FrameMetrics) -> f64| {
        if metrics.is_empty() {
            0.0
        } else {
            metrics.iter().map(f).sum::<f64>() / metrics.len() as f64
        }
    };

    let hop_secs = HOP_SIZE as f64 / sample_rate as f64;

    Ok(FeatureVector {
        rms,
        zcr,
        spectral_centroid_hz: mean(&|m| m.centroid),
        high_freq_energy_ratio: mean(&|m| m.high_ratio),
        peak_density_per_sec: mean(&|m| m.peaks as f64) / hop_secs,
    })
}

/// Features of a decoded signal: the first thirty seconds, downmixed to mono.
/// Degrades to an all-zero vector instead of failing.
pub fn extract_features_from(signal: &AudioSignal) -> FeatureVector {
    let mut head = signal.clone();
    head.truncate_secs(MAX_ANALYSIS_SECS);
    let mono = head.downmix();

    compute_features(&mono, signal.sample_rate).unwrap_or_else(|err| {
        log::warn!("Feature extraction failed: {}", err);
        FeatureVector::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn silence_has_zero_rms() {
        let f = compute_features(&vec![0.0; 10_000], 44_100).unwrap();
        assert_eq!(f.rms, 0.0);
        assert_eq!(f.zcr, 0.0);
    }

    #[test]
    fn square_wave_has_unit_rms() {
        let square: Vec<f32> = (0..44_100).map(|i| if (i / 50) % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let f = compute_features(&square, 44_100).unwrap();
        assert_abs_diff_eq!(f.rms, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn sine_zero_crossing_rate_is_twice_frequency() {
        let f = compute_features(&sine(440.0, 44_100, 1.0), 44_100).unwrap();
        assert!((f.zcr - 880.0).abs() < 880.0 * 0.01, "zcr = {}", f.zcr);
    }

    #[test]
    fn sine_centroid_sits_near_tone() {
        // Centered on bin 93 so window leakage stays negligible.
        let freq = 93.0 * 44_100.0 / FRAME_SIZE as f32;
        let f = compute_features(&sine(freq, 44_100, 2.0), 44_100).unwrap();
        assert!((f.spectral_centroid_hz - freq as f64).abs() < 50.0, "centroid = {}", f.spectral_centroid_hz);
        assert!(f.high_freq_energy_ratio < 0.05);
    }

    #[test]
    fn white_noise_spreads_energy_high() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let noise: Vec<f32> = (0..88_200).map(|_| rng.random_range(-0.5..0.5)).collect();
        let f = compute_features(&noise, 44_100).unwrap();
        // 8 kHz..22.05 kHz is ~64% of the half spectrum.
        assert!((f.high_freq_energy_ratio - 0.64).abs() < 0.05);
        assert!(f.spectral_centroid_hz > 9_000.0 && f.spectral_centroid_hz < 13_000.0);
    }

    #[test]
    fn short_input_skips_spectral_metrics() {
        let f = compute_features(&sine(440.0, 44_100, 0.05), 44_100).unwrap();
        assert!(f.rms > 0.0);
        assert_eq!(f.spectral_centroid_hz, 0.0);
        assert_eq!(f.peak_density_per_sec, 0.0);
    }

    #[test]
    fn extraction_is_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let samples: Vec<f32> = (0..50_000).map(|_| rng.random_range(-1.0..1.0)).collect();
        let signal = AudioSignal::mono(samples, 44_100);
        assert_eq!(extract_features_from(&signal), extract_features_from(&signal));
    }

    #[test]
    fn empty_signal_yields_zero_vector() {
        let signal = AudioSignal::new(vec![Vec::new(), Vec::new()], 44_100, 16);
        assert_eq!(extract_features_from(&signal), FeatureVector::default());
    }

    #[test]
    fn analysis_is_capped_at_thirty_seconds() {
        let sr = 1_000;
        let mut samples = vec![0.0f32; sr as usize * 30];
        samples.extend(std::iter::repeat(1.0).take(sr as usize * 10));
        let f = extract_features_from(&AudioSignal::mono(samples, sr));
        assert_eq!(f.rms, 0.0);
    }
}
