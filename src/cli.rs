use clap::Parser;
use std::path::PathBuf;

use crate::audio::grid::HopRounding;

#[derive(Parser, Debug)]
#[command(
    name = "pulsetrack",
    about = "Per-frame loudness, band energy and onset track from an audio file",
    allow_negative_numbers = true
)]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC; other formats via ffmpeg)
    pub input: PathBuf,

    /// Output CSV file [default: <input name>.csv in the current directory]
    pub output: Option<PathBuf>,

    /// Output frames per second [default: 24, or the config file's value]
    pub frame_rate: Option<i64>,

    /// Config file (TOML). Defaults to ./pulsetrack.toml or the user config dir
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Decimal places for feature values
    #[arg(long)]
    pub precision: Option<usize>,

    /// ffmpeg binary used for formats the built-in decoder cannot read
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Never fall back to ffmpeg
    #[arg(long)]
    pub no_ffmpeg_fallback: bool,

    /// How samples-per-frame is rounded to a whole hop
    #[arg(long, value_enum)]
    pub hop_rounding: Option<HopRounding>,

    /// Only log warnings and errors; no progress bar
    #[arg(short, long)]
    pub quiet: bool,
}
