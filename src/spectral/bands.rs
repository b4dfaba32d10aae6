//! Per-bin spectrum edits shared by both passes.
//!
//! Every edit on bin `k` is mirrored onto bin `N - k - 1`. That pairing is
//! one bin off from the true conjugate partner `N - k`; it is kept because
//! it defines the reference output, and only the real part of the inverse
//! transform is used.

use rustfft::num_complex::Complex64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttenuationBand {
    pub low_hz: f64,
    pub high_hz: f64,
    /// Fraction removed: bins are multiplied by `1 - strength`.
    pub strength: f64,
}

impl AttenuationBand {
    pub const fn new(low_hz: f64, high_hz: f64, strength: f64) -> Self {
        Self {
            low_hz,
            high_hz,
            strength,
        }
    }

    /// Inclusive bin range covered by the band, clamped below Nyquist.
    /// Empty when the band lies above the representable range.
    pub fn bins(&self, bin_freq: f64, frame_size: usize) -> std::ops::RangeInclusive<usize> {
        let low = (self.low_hz / bin_freq).floor().max(0.0) as usize;
        let high = ((self.high_hz / bin_freq).ceil() as usize).min(frame_size / 2 - 1);
        low..=high
    }
}

/// Suspected fingerprint bands removed by the conservative pass.
pub const FINGERPRINT_BANDS: [AttenuationBand; 6] = [
    AttenuationBand::new(19_000.0, 20_000.0, 0.5),
    AttenuationBand::new(17_500.0, 18_500.0, 0.4),
    AttenuationBand::new(15_000.0, 16_000.0, 0.35),
    AttenuationBand::new(12_000.0, 12_500.0, 0.25),
    AttenuationBand::new(8_000.0, 8_500.0, 0.2),
    AttenuationBand::new(50.0, 200.0, 0.15),
];

pub const ROLLOFF_START_HZ: f64 = 16_000.0;
pub const ROLLOFF_SPAN_HZ: f64 = 4_000.0;
pub const ROLLOFF_DEPTH: f64 = 0.35;

#[inline]
fn mirror(frame_size: usize, k: usize) -> usize {
    frame_size - k - 1
}

/// Multiply bin `k` and its mirror by `factor`.
pub fn scale_bin(spectrum: &mut [Complex64], k: usize, factor: f64) {
    let n = spectrum.len();
    spectrum[k] *= factor;
    spectrum[mirror(n, k)] *= factor;
}

pub fn attenuate_bands(spectrum: &mut [Complex64], bands: &[AttenuationBand], bin_freq: f64) {
    let n = spectrum.len();
    for band in bands {
        let factor = 1.0 - band.strength;
        for k in band.bins(bin_freq, n) {
            scale_bin(spectrum, k, factor);
        }
    }
}

/// Linear gain ramp from 1.0 at 16 kHz down to 0.65 at 20 kHz and above.
pub fn rolloff_factor(freq: f64) -> f64 {
    let att = ((freq - ROLLOFF_START_HZ) / ROLLOFF_SPAN_HZ).clamp(0.0, 1.0);
    1.0 - ROLLOFF_DEPTH * att
}

pub fn apply_rolloff(spectrum: &mut [Complex64], bin_freq: f64) {
    let half = spectrum.len() / 2;
    for k in 0..half {
        let freq = k as f64 * bin_freq;
        if freq >= ROLLOFF_START_HZ {
            scale_bin(spectrum, k, rolloff_factor(freq));
        }
    }
}

/// Scale every bin whose center lies in `[low_hz, high_hz]`.
pub fn scale_range(spectrum: &mut [Complex64], low_hz: f64, high_hz: f64, factor: f64, bin_freq: f64) {
    let half = spectrum.len() / 2;
    for k in 0..half {
        let freq = k as f64 * bin_freq;
        if (low_hz..=high_hz).contains(&freq) {
            scale_bin(spectrum, k, factor);
        }
    }
}

/// Subtract `alpha` times the mean magnitude of `mags[hf_start..]` from every
/// bin from `hf_start` up to Nyquist, keeping phase. The mirror gets the same
/// magnitude with negated phase.
pub fn subtract_noise_floor(spectrum: &mut [Complex64], mags: &[f64], hf_start: usize, alpha: f64) {
    let n = spectrum.len();
    let tail = &mags[hf_start..];
    if tail.is_empty() {
        return;
    }
    let estimate = tail.iter().sum::<f64>() / tail.len() as f64;

    for (k, &mag) in mags.iter().enumerate().skip(hf_start) {
        let cleaned = (mag - alpha * estimate).max(0.0);
        let phase = spectrum[k].arg();
        spectrum[k] = Complex64::from_polar(cleaned, phase);
        spectrum[mirror(n, k)] = Complex64::from_polar(cleaned, -phase);
    }
}

/// Rotate bin `hf_start + i` by `offsets[i]` and its mirror by `-offsets[i]`.
pub fn rotate_phases(spectrum: &mut [Complex64], hf_start: usize, offsets: &[f64]) {
    let n = spectrum.len();
    for (k, &offset) in (hf_start..n / 2).zip(offsets) {
        let (mag, ang) = spectrum[k].to_polar();
        spectrum[k] = Complex64::from_polar(mag, ang + offset);

        let m = mirror(n, k);
        let (mag, ang) = spectrum[m].to_polar();
        spectrum[m] = Complex64::from_polar(mag, ang - offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const N: usize = 4096;
    const BIN_FREQ: f64 = 44_100.0 / N as f64;

    fn flat_spectrum() -> Vec<Complex64> {
        vec![Complex64::new(1.0, 1.0); N]
    }

    fn band_energy(spectrum: &[Complex64], low: f64, high: f64) -> f64 {
        (0..N / 2)
            .filter(|&k| (low..=high).contains(&(k as f64 * BIN_FREQ)))
            .map(|k| spectrum[k].norm_sqr())
            .sum()
    }

    #[test]
    fn band_bins_cover_edges() {
        let band = AttenuationBand::new(19_000.0, 20_000.0, 0.5);
        let bins = band.bins(BIN_FREQ, N);
        assert_eq!(*bins.start(), 1764);
        assert_eq!(*bins.end(), 1858);
    }

    #[test]
    fn bands_above_nyquist_are_empty() {
        let band = AttenuationBand::new(19_000.0, 20_000.0, 0.5);
        assert!(band.bins(16_000.0 / N as f64, N).is_empty());
    }

    #[test]
    fn fingerprint_band_halves_magnitude_and_spares_midrange() {
        let mut spectrum = flat_spectrum();
        let before_hi = band_energy(&spectrum, 19_000.0, 20_000.0);
        let before_mid = band_energy(&spectrum, 1_000.0, 2_000.0);

        attenuate_bands(&mut spectrum, &FINGERPRINT_BANDS, BIN_FREQ);

        let k = (19_500.0 / BIN_FREQ) as usize;
        assert_abs_diff_eq!(spectrum[k].norm(), 0.5 * 2f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(spectrum[N - k - 1].norm(), 0.5 * 2f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(band_energy(&spectrum, 19_000.0, 20_000.0), 0.25 * before_hi, epsilon = 1e-9);
        assert_abs_diff_eq!(band_energy(&spectrum, 1_000.0, 2_000.0), before_mid, epsilon = 1e-9);
    }

    #[test]
    fn rolloff_ramp() {
        assert_eq!(rolloff_factor(10_000.0), 1.0);
        assert_eq!(rolloff_factor(16_000.0), 1.0);
        assert_abs_diff_eq!(rolloff_factor(18_000.0), 0.825, epsilon = 1e-12);
        assert_abs_diff_eq!(rolloff_factor(21_000.0), 0.65, epsilon = 1e-12);

        let mut spectrum = flat_spectrum();
        apply_rolloff(&mut spectrum, BIN_FREQ);
        assert_eq!(spectrum[100], Complex64::new(1.0, 1.0));
        assert!(spectrum[N / 2 - 1].norm() < spectrum[1500].norm());
    }

    #[test]
    fn range_scaling_is_inclusive() {
        let mut spectrum = flat_spectrum();
        scale_range(&mut spectrum, 8_000.0, 12_500.0, 0.6, BIN_FREQ);
        let inside = (10_000.0 / BIN_FREQ) as usize;
        let below = (7_000.0 / BIN_FREQ) as usize;
        assert_abs_diff_eq!(spectrum[inside].re, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(spectrum[N - inside - 1].re, 0.6, epsilon = 1e-12);
        assert_eq!(spectrum[below].re, 1.0);
    }

    #[test]
    fn noise_floor_subtraction_keeps_phase() {
        let mut spectrum: Vec<Complex64> = (0..N)
            .map(|k| Complex64::from_polar(1.0 + (k % 3) as f64, 0.3))
            .collect();
        let mags: Vec<f64> = spectrum.iter().take(N / 2).map(|c| c.norm()).collect();
        let hf_start = 1400;
        let estimate = mags[hf_start..].iter().sum::<f64>() / (N / 2 - hf_start) as f64;

        subtract_noise_floor(&mut spectrum, &mags, hf_start, 0.8);

        for k in hf_start..N / 2 {
            let expected = (mags[k] - 0.8 * estimate).max(0.0);
            assert_abs_diff_eq!(spectrum[k].norm(), expected, epsilon = 1e-9);
            assert_abs_diff_eq!(spectrum[N - k - 1].norm(), expected, epsilon = 1e-9);
            if expected > 0.0 {
                assert_abs_diff_eq!(spectrum[k].arg(), 0.3, epsilon = 1e-9);
                assert_abs_diff_eq!(spectrum[N - k - 1].arg(), -0.3, epsilon = 1e-9);
            }
        }
        assert_abs_diff_eq!(spectrum[10].norm(), mags[10], epsilon = 1e-12);
    }

    #[test]
    fn phase_rotation_is_antisymmetric() {
        let mut spectrum = vec![Complex64::from_polar(2.0, 0.0); N];
        let offsets = vec![0.01; N / 2 - 2000];
        rotate_phases(&mut spectrum, 2000, &offsets);
        assert_abs_diff_eq!(spectrum[2000].arg(), 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(spectrum[N - 2000 - 1].arg(), -0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(spectrum[2000].norm(), 2.0, epsilon = 1e-12);
        assert_eq!(spectrum[1999].arg(), 0.0);
    }
}
