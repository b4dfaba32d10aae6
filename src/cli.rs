use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "broom", about = "Spectral fingerprint analysis and removal for audio files")]
pub struct Cli {
    /// Config file (default: ./broom.toml or ~/.config/broom/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show file facts, signal features and the fingerprint score
    Analyze {
        /// Input audio file (MP3, WAV, FLAC, OGG, AAC)
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print only the fingerprint score
    Detect {
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Attenuate suspected fingerprint bands and re-encode
    Clean {
        input: PathBuf,

        /// Output file (default: <input>_clean.mp3 next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target bitrate in kbps (default: estimated from the input)
        #[arg(short, long)]
        bitrate: Option<u32>,

        /// Keep the Pass 1 / Pass 2 WAV files
        #[arg(long)]
        keep_intermediates: bool,

        /// Re-analyze the cleaned file and compare with the input
        #[arg(long)]
        report: bool,

        /// FFmpeg binary used for encoding
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: String,
    },
}
