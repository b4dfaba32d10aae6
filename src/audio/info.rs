use std::path::Path;

use serde::Serialize;

use super::signal::AudioSignal;

/// File-level facts shown next to the analysis results.
#[derive(Clone, Debug, Serialize)]
pub struct AudioFileInfo {
    pub name: String,
    pub size_bytes: u64,
    pub duration_secs: f64,
    pub estimated_bitrate_kbps: Option<u32>,
    pub sample_rate: u32,
    pub channels: usize,
    pub bits_per_sample: u16,
}

impl AudioFileInfo {
    pub fn new(path: &Path, signal: &AudioSignal) -> std::io::Result<Self> {
        let size_bytes = std::fs::metadata(path)?.len();
        let duration_secs = signal.duration_secs();
        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes,
            duration_secs,
            estimated_bitrate_kbps: estimate_bitrate_kbps(size_bytes, duration_secs),
            sample_rate: signal.sample_rate,
            channels: signal.channel_count(),
            bits_per_sample: signal.bits_per_sample,
        })
    }
}

/// Average bitrate implied by the file size, in kbps.
pub fn estimate_bitrate_kbps(size_bytes: u64, duration_secs: f64) -> Option<u32> {
    if duration_secs <= 0.0 {
        return None;
    }
    let kbps = (size_bytes as f64 * 8.0 / duration_secs / 1000.0).round();
    (kbps >= 1.0).then_some(kbps as u32)
}

/// `hh:mm:ss.cc` for durations, `mm:ss.cc` under an hour.
pub fn format_duration(seconds: f64) -> String {
    let total_secs = seconds.max(0.0) as u64;
    let centis = ((seconds.max(0.0) - total_secs as f64) * 100.0) as u64;
    if total_secs >= 3600 {
        format!(
            "{:02}:{:02}:{:02}.{:02}",
            total_secs / 3600,
            (total_secs % 3600) / 60,
            total_secs % 60,
            centis
        )
    } else {
        format!("{:02}:{:02}.{:02}", total_secs / 60, total_secs % 60, centis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrate_from_size_and_duration() {
        // 10s at 128 kbps is 160 000 bytes.
        assert_eq!(estimate_bitrate_kbps(160_000, 10.0), Some(128));
        assert_eq!(estimate_bitrate_kbps(160_000, 0.0), None);
        assert_eq!(estimate_bitrate_kbps(0, 10.0), None);
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(65.5), "01:05.50");
        assert_eq!(format_duration(3725.0), "01:02:05.00");
    }
}
