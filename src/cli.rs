use clap::Parser;
use std::path::PathBuf;

use crate::meter::engine::{DEFAULT_WINDOW_SECONDS, WINDOW_CHOICES};
use crate::meter::{AverageMode, ConfigError, LoudnessScale, WindowKind};
use crate::scheduler::WindowChange;

#[derive(Parser, Debug)]
#[command(name = "loudmeter", about = "Loudness meter with windowed and running averages")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Config file (defaults to ./loudmeter.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Averaging window in seconds (5, 10, 30 or 60)
    #[arg(short, long, default_value_t = DEFAULT_WINDOW_SECONDS, value_parser = parse_window_seconds)]
    pub window: u32,

    /// How the window forgets samples
    #[arg(long, value_enum, default_value_t = WindowKind::Time)]
    pub window_kind: WindowKind,

    /// Which average to report
    #[arg(short, long, value_enum, default_value_t = AverageMode::WindowMean)]
    pub average: AverageMode,

    /// How a spectral frame is reduced to loudness
    #[arg(short, long, value_enum, default_value_t = LoudnessScale::Linear)]
    pub scale: LoudnessScale,

    /// Change the window during the run, AT=SECONDS (e.g. 12.5=30). Repeatable.
    #[arg(long = "window-change", value_name = "AT=SECS", value_delimiter = ',')]
    pub window_changes: Vec<WindowChange>,

    /// Ticks per second
    #[arg(long, default_value_t = 60)]
    pub tick_rate: u32,

    /// Analyser FFT size (power of two, 32-32768)
    #[arg(long, default_value_t = 256)]
    pub fft_size: usize,

    /// Analyser smoothing time constant (0.0-1.0)
    #[arg(long, default_value_t = 0.8)]
    pub smoothing: f32,

    /// Level mapped to byte 0
    #[arg(long, default_value_t = -100.0, allow_hyphen_values = true)]
    pub min_db: f32,

    /// Level mapped to byte 255
    #[arg(long, default_value_t = -30.0, allow_hyphen_values = true)]
    pub max_db: f32,

    /// Pace ticks in real time instead of as fast as possible
    #[arg(long)]
    pub realtime: bool,

    /// Write one JSON object per tick to this file
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Include the history snapshot in every JSON line
    #[arg(long)]
    pub json_history: bool,

    /// Write the chart series as JSON when done
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Points kept in the chart series
    #[arg(long, default_value_t = 50)]
    pub chart_points: usize,

    /// Hide the live meter
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn parse_window_seconds(s: &str) -> Result<u32, ConfigError> {
    let secs: u32 = s
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidWindow(s.to_string()))?;
    check_window_seconds(secs)?;
    Ok(secs)
}

pub fn check_window_seconds(secs: u32) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ZeroWindow);
    }
    if !WINDOW_CHOICES.contains(&secs) {
        return Err(ConfigError::UnsupportedWindow(secs));
    }
    Ok(())
}
