use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::analyser::AnalyserSettings;
use crate::cli::check_window_seconds;
use crate::display::chart::DEFAULT_CHART_POINTS;
use crate::meter::engine::DEFAULT_WINDOW_SECONDS;
use crate::meter::{AverageMode, LoudnessScale, WindowKind};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub meter: MeterConfig,
    #[serde(default)]
    pub analyser: AnalyserSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct MeterConfig {
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u32,
    #[serde(default)]
    pub window: WindowKind,
    #[serde(default)]
    pub average: AverageMode,
    #[serde(default)]
    pub scale: LoudnessScale,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    #[serde(default = "default_chart_points")]
    pub chart_points: usize,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            window: WindowKind::default(),
            average: AverageMode::default(),
            scale: LoudnessScale::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            chart_points: default_chart_points(),
        }
    }
}

fn default_window_seconds() -> u32 { DEFAULT_WINDOW_SECONDS }
fn default_tick_rate() -> u32 { 60 }
fn default_chart_points() -> usize { DEFAULT_CHART_POINTS }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Invalid config file")?;
    check_window_seconds(config.meter.window_seconds)?;
    config.analyser.validate()?;
    Ok(config)
}

/// Local `loudmeter.toml`, then `~/.config/loudmeter/config.toml`, then the
/// platform config directory.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("loudmeter.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("loudmeter").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("loudmeter").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.meter.window_seconds, 10);
        assert_eq!(cfg.meter.average, AverageMode::WindowMean);
        assert_eq!(cfg.analyser, AnalyserSettings::default());
        assert_eq!(cfg.output.tick_rate, 60);
        assert_eq!(cfg.output.chart_points, 50);
    }

    #[test]
    fn reads_all_sections() {
        let cfg = parse_config(
            r#"
            [meter]
            window_seconds = 30
            window = "count"
            average = "running"
            scale = "power-db"

            [analyser]
            fft_size = 2048
            smoothing_time_constant = 0.5

            [output]
            tick_rate = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.meter.window_seconds, 30);
        assert_eq!(cfg.meter.window, WindowKind::Count);
        assert_eq!(cfg.meter.average, AverageMode::Running);
        assert_eq!(cfg.meter.scale, LoudnessScale::PowerDb);
        assert_eq!(cfg.analyser.fft_size, 2048);
        assert_eq!(cfg.analyser.min_decibels, -100.0);
        assert_eq!(cfg.output.tick_rate, 30);
    }

    #[test]
    fn rejects_unsupported_window() {
        assert!(parse_config("[meter]\nwindow_seconds = 7\n").is_err());
        assert!(parse_config("[analyser]\nfft_size = 1000\n").is_err());
    }
}
