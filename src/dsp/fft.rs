//! In-place radix-2 FFT.
//!
//! The edit passes need bit-exact control over which bins are touched and how
//! mirror bins are paired, so the transform is a plain iterative Cooley-Tukey
//! kernel over `Complex64` rather than a planned transform.

use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::FftError;

fn check_len(len: usize) -> Result<(), FftError> {
    if len == 0 || !len.is_power_of_two() {
        return Err(FftError::SizeError { len });
    }
    Ok(())
}

fn reverse_bits(mut x: usize, bits: u32) -> usize {
    let mut y = 0;
    for _ in 0..bits {
        y = (y << 1) | (x & 1);
        x >>= 1;
    }
    y
}

/// Forward transform, in place. Unnormalized.
pub fn fft(buffer: &mut [Complex64]) -> Result<(), FftError> {
    let n = buffer.len();
    check_len(n)?;
    let bits = n.trailing_zeros();

    for i in 0..n {
        let j = reverse_bits(i, bits);
        if j > i {
            buffer.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let angle = -2.0 * PI / len as f64;
        let wlen = Complex64::new(angle.cos(), angle.sin());
        let half = len / 2;
        for chunk in buffer.chunks_exact_mut(len) {
            let mut w = Complex64::new(1.0, 0.0);
            for j in 0..half {
                let u = chunk[j];
                let v = chunk[j + half] * w;
                chunk[j] = u + v;
                chunk[j + half] = u - v;
                w *= wlen;
            }
        }
        len <<= 1;
    }

    Ok(())
}

/// Inverse transform, in place, scaled by `1/n` so that `ifft(fft(x)) == x`.
pub fn ifft(buffer: &mut [Complex64]) -> Result<(), FftError> {
    check_len(buffer.len())?;
    let scale = 1.0 / buffer.len() as f64;

    for c in buffer.iter_mut() {
        *c = c.conj();
    }
    fft(buffer)?;
    for c in buffer.iter_mut() {
        *c = c.conj() * scale;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rustfft::FftPlanner;

    fn random_buffer(len: usize, seed: u64) -> Vec<Complex64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..len)
            .map(|_| Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
            .collect()
    }

    #[test]
    fn rejects_non_power_of_two() {
        let mut buf = vec![Complex64::new(0.0, 0.0); 1000];
        assert_eq!(fft(&mut buf), Err(FftError::SizeError { len: 1000 }));
        assert_eq!(ifft(&mut buf), Err(FftError::SizeError { len: 1000 }));

        let mut empty: Vec<Complex64> = Vec::new();
        assert!(fft(&mut empty).is_err());
    }

    #[test]
    fn single_sample_is_identity() {
        let mut buf = vec![Complex64::new(0.25, -0.5)];
        fft(&mut buf).unwrap();
        assert_eq!(buf[0], Complex64::new(0.25, -0.5));
    }

    #[test]
    fn impulse_has_flat_spectrum() {
        let mut buf = vec![Complex64::new(0.0, 0.0); 64];
        buf[0] = Complex64::new(1.0, 0.0);
        fft(&mut buf).unwrap();
        for c in &buf {
            assert_abs_diff_eq!(c.re, 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(c.im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn matches_rustfft() {
        let input = random_buffer(4096, 7);

        let mut ours = input.clone();
        fft(&mut ours).unwrap();

        let mut reference = input;
        FftPlanner::<f64>::new()
            .plan_fft_forward(4096)
            .process(&mut reference);

        for (a, b) in ours.iter().zip(reference.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-9);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn inverse_recovers_input() {
        for (i, &len) in [2usize, 8, 256, 4096].iter().enumerate() {
            let input = random_buffer(len, i as u64);
            let mut buf = input.clone();
            fft(&mut buf).unwrap();
            ifft(&mut buf).unwrap();
            for (a, b) in buf.iter().zip(input.iter()) {
                assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-9 * b.re.abs().max(1.0));
                assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-9 * b.im.abs().max(1.0));
            }
        }
    }

    #[test]
    fn sine_lands_in_its_bin() {
        let n = 1024;
        let mut buf: Vec<Complex64> = (0..n)
            .map(|i| Complex64::new((2.0 * PI * 32.0 * i as f64 / n as f64).sin(), 0.0))
            .collect();
        fft(&mut buf).unwrap();
        let peak = buf[..n / 2]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(k, _)| k);
        assert_eq!(peak, Some(32));
        assert_abs_diff_eq!(buf[32].norm(), n as f64 / 2.0, epsilon = 1e-6);
    }
}
