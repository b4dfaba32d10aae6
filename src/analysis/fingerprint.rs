//! Heuristic "generated audio" likelihood.
//!
//! Flat, noise-like spectra with a lot of energy above 8 kHz score high;
//! tonal material scores low. Detection is advisory and never fails.

use rayon::prelude::*;
use serde::Serialize;

use super::features::{compute_features, half_spectrum, MAX_ANALYSIS_SECS};
use crate::audio::AudioSignal;
use crate::dsp::framer::{analysis_frame_starts, FRAME_SIZE};
use crate::dsp::window::hamming;
use crate::error::FftError;

/// Fewer samples than this cannot be scored.
const MIN_SAMPLES: usize = 1024;

const FLATNESS_FLOOR: f64 = 0.15;
const FLATNESS_CEIL: f64 = 0.6;
const HIGH_RATIO_FLOOR: f64 = 0.05;
const HIGH_RATIO_SPAN: f64 = 0.4;
const PEAK_DENSITY_SPAN: f64 = 10.0;

const WEIGHT_FLATNESS: f64 = 0.6;
const WEIGHT_HIGH: f64 = 0.3;
const WEIGHT_PEAKS: f64 = 0.1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FingerprintScore {
    pub likely: bool,
    pub score: f64,
}

impl FingerprintScore {
    pub fn from_score(score: f64) -> Self {
        Self {
            likely: score > 0.5,
            score,
        }
    }
}

/// Geometric over arithmetic mean of a magnitude spectrum.
pub fn spectral_flatness(mags: &[f64]) -> f64 {
    if mags.is_empty() {
        return 0.0;
    }
    let n = mags.len() as f64;
    let arith = mags.iter().sum::<f64>() / n;
    let geom = (mags.iter().map(|m| m.ln()).sum::<f64>() / n).exp();
    if arith > 0.0 {
        geom / arith
    } else {
        0.0
    }
}

/// Mean flatness across full analysis frames, `None` when no frame fits.
pub fn average_flatness(samples: &[f32]) -> Result<Option<f64>, FftError> {
    let window = hamming(FRAME_SIZE);
    let starts: Vec<usize> = analysis_frame_starts(samples.len()).collect();
    if starts.is_empty() {
        return Ok(None);
    }

    let values = starts
        .par_iter()
        .map(|&pos| half_spectrum(samples, pos, &window).map(|mags| spectral_flatness(&mags)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
}

/// Weighted blend of the normalized flatness, high-band ratio and peak density.
pub fn combine(avg_flatness: f64, high_freq_ratio: f64, peak_density_per_sec: f64) -> f64 {
    let norm_flat = ((avg_flatness - FLATNESS_FLOOR) / (FLATNESS_CEIL - FLATNESS_FLOOR)).clamp(0.0, 1.0);
    let norm_high = ((high_freq_ratio - HIGH_RATIO_FLOOR) / HIGH_RATIO_SPAN).clamp(0.0, 1.0);
    let norm_peak = (peak_density_per_sec / PEAK_DENSITY_SPAN).clamp(0.0, 1.0);
    WEIGHT_FLATNESS * norm_flat + WEIGHT_HIGH * norm_high + WEIGHT_PEAKS * norm_peak
}

fn score_mono(samples: &[f32], sample_rate: u32) -> Result<FingerprintScore, FftError> {
    if samples.len() < MIN_SAMPLES || sample_rate == 0 {
        return Ok(FingerprintScore::default());
    }
    let Some(avg_flatness) = average_flatness(samples)? else {
        return Ok(FingerprintScore::default());
    };
    let features = compute_features(samples, sample_rate)?;

    let score = combine(
        avg_flatness,
        features.high_freq_energy_ratio,
        features.peak_density_per_sec,
    );
    log::debug!(
        "Fingerprint: flatness={:.4}, high_ratio={:.4}, peaks/s={:.1}, score={:.3}",
        avg_flatness,
        features.high_freq_energy_ratio,
        features.peak_density_per_sec,
        score
    );
    Ok(FingerprintScore::from_score(score))
}

/// Score a decoded signal (first thirty seconds, downmixed).
/// Any failure yields `(false, 0.0)`.
pub fn detect_fingerprint_from(signal: &AudioSignal) -> FingerprintScore {
    let mut head = signal.clone();
    head.truncate_secs(MAX_ANALYSIS_SECS);
    let mono = head.downmix();

    score_mono(&mono, signal.sample_rate).unwrap_or_else(|err| {
        log::warn!("Fingerprint detection failed: {}", err);
        FingerprintScore::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::f32::consts::PI;

    #[test]
    fn white_noise_scores_likely() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let noise: Vec<f32> = (0..44_100 * 2).map(|_| rng.random_range(-0.8..0.8)).collect();
        let result = detect_fingerprint_from(&AudioSignal::mono(noise, 44_100));
        assert!(result.score > 0.5, "score = {}", result.score);
        assert!(result.likely);
    }

    #[test]
    fn pure_tone_scores_unlikely() {
        let tone: Vec<f32> = (0..44_100 * 2)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 44_100.0).sin() * 0.8)
            .collect();
        let result = detect_fingerprint_from(&AudioSignal::mono(tone, 44_100));
        assert!(result.score < 0.5, "score = {}", result.score);
        assert!(!result.likely);
    }

    #[test]
    fn too_short_is_neutral() {
        let result = detect_fingerprint_from(&AudioSignal::mono(vec![0.5; 512], 44_100));
        assert_eq!(result, FingerprintScore::default());

        // Enough samples to score but not a single full frame.
        let result = detect_fingerprint_from(&AudioSignal::mono(vec![0.5; 2_000], 44_100));
        assert_eq!(result, FingerprintScore::default());
    }

    #[test]
    fn flatness_bounds() {
        assert_abs_diff_eq!(spectral_flatness(&[2.0; 64]), 1.0, epsilon = 1e-12);
        let mut peaky = vec![1e-12; 64];
        peaky[10] = 1.0;
        assert!(spectral_flatness(&peaky) < 0.01);
    }

    #[test]
    fn combine_weights_and_clamps() {
        assert_abs_diff_eq!(combine(1.0, 1.0, 100.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(combine(0.0, 0.0, 0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(combine(0.375, 0.25, 5.0), 0.6 * 0.5 + 0.3 * 0.5 + 0.1 * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn likely_threshold_is_strict() {
        assert!(!FingerprintScore::from_score(0.5).likely);
        assert!(FingerprintScore::from_score(0.5001).likely);
    }

    #[test]
    fn stereo_is_scored_on_its_downmix() {
        // 600 frames x 2 ch is 1200 interleaved samples, still below the minimum
        let short = AudioSignal::new(vec![vec![0.5; 600], vec![-0.5; 600]], 44_100, 16);
        assert_eq!(detect_fingerprint_from(&short), FingerprintScore::default());

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let left: Vec<f32> = (0..44_100).map(|_| rng.random_range(-0.5..0.5)).collect();
        let right: Vec<f32> = (0..44_100).map(|_| rng.random_range(-0.5..0.5)).collect();
        let stereo = AudioSignal::new(vec![left, right], 44_100, 16);
        let mono = AudioSignal::mono(stereo.downmix(), 44_100);
        assert_eq!(detect_fingerprint_from(&stereo), detect_fingerprint_from(&mono));
    }
}
