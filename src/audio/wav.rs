//! Intermediate PCM files written between passes and as the encode fallback.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::signal::AudioSignal;

fn spec_for(signal: &AudioSignal) -> WavSpec {
    let bits = match signal.bits_per_sample {
        8 | 16 | 24 | 32 => signal.bits_per_sample,
        _ => 16,
    };
    WavSpec {
        channels: signal.channel_count() as u16,
        sample_rate: signal.sample_rate,
        bits_per_sample: bits,
        sample_format: if bits == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    }
}

/// Write interleaved PCM at the signal's bit depth (32-bit is written as float).
pub fn write_wav(path: &Path, signal: &AudioSignal) -> Result<(), hound::Error> {
    let spec = spec_for(signal);
    let mut writer = WavWriter::create(path, spec)?;

    match spec.sample_format {
        SampleFormat::Float => {
            for sample in signal.to_interleaved() {
                writer.write_sample(sample)?;
            }
        }
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            for sample in signal.to_interleaved() {
                let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                writer.write_sample(int_sample)?;
            }
        }
    }

    writer.finalize()
}

pub fn read_wav(path: &Path) -> Result<AudioSignal, hound::Error> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(AudioSignal::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
        spec.bits_per_sample,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sixteen_bit_quantizes_within_one_lsb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.wav");
        let samples: Vec<f32> = (0..1_000).map(|i| ((i as f32) * 0.01).sin() * 0.9).collect();
        let signal = AudioSignal::new(vec![samples.clone(), samples.clone()], 22_050, 16);
        write_wav(&path, &signal).unwrap();

        let back = read_wav(&path).unwrap();
        assert_eq!(back.channel_count(), 2);
        assert_eq!(back.sample_rate, 22_050);
        for (a, b) in back.channels[1].iter().zip(&samples) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1.0 / 32_768.0);
        }
    }

    #[test]
    fn float_wav_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.wav");
        let signal = AudioSignal::new(vec![vec![0.123_456, -0.987_654, 1.0]], 48_000, 32);
        write_wav(&path, &signal).unwrap();
        assert_eq!(read_wav(&path).unwrap(), signal);
    }

    #[test]
    fn full_scale_is_clipped_not_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        write_wav(&path, &AudioSignal::mono(vec![1.0, -1.0], 8_000)).unwrap();
        let back = read_wav(&path).unwrap();
        assert!(back.channels[0][0] > 0.999);
        assert_eq!(back.channels[0][1], -1.0);
    }
}
