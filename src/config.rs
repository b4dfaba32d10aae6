use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    /// Overrides the codec picked from the output extension.
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default = "default_fallback_bitrate")]
    pub fallback_bitrate_kbps: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub keep_intermediates: bool,
    #[serde(default)]
    pub intermediate_dir: Option<PathBuf>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            codec: None,
            fallback_bitrate_kbps: default_fallback_bitrate(),
        }
    }
}

fn default_ffmpeg() -> String { "ffmpeg".into() }
fn default_fallback_bitrate() -> u32 { broom::pipeline::DEFAULT_BITRATE_KBPS }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Explicit path first, then `broom.toml` in the working directory, then the
/// per-user config files.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("broom.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("broom").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("broom").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
