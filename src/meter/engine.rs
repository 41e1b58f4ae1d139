use serde::{Deserialize, Serialize};

use super::average::{AverageMode, Averager};
use super::history::{HistoryWindow, WindowKind};
use super::loudness::{compute_loudness, LoudnessScale};
use super::ConfigError;
use crate::audio::frontend::AudioFrontend;

/// Window lengths offered by the interval control.
pub const WINDOW_CHOICES: [u32; 4] = [5, 10, 30, 60];

pub const DEFAULT_WINDOW_SECONDS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AveragingConfig {
    pub window_seconds: u32,
    pub window: WindowKind,
    pub mode: AverageMode,
}

impl Default for AveragingConfig {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            window: WindowKind::default(),
            mode: AverageMode::default(),
        }
    }
}

impl AveragingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_seconds == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(())
    }
}

/// One entry of the history handed to the chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryPoint {
    /// Seconds relative to the tick that produced the snapshot (<= 0)
    pub offset_seconds: f64,
    pub value: f64,
    pub average: Option<f64>,
}

/// Everything a display needs after one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TickReport {
    pub time_ms: u64,
    pub current: f64,
    pub average: Option<f64>,
    pub history: Vec<HistoryPoint>,
}

/// Loudness averaging engine. Owns its frontend and history; one `tick` per
/// scheduler frame.
pub struct LoudnessEngine<F> {
    frontend: F,
    scale: LoudnessScale,
    config: AveragingConfig,
    history: HistoryWindow,
    averager: Averager,
    current: Option<f64>,
}

impl<F: AudioFrontend> LoudnessEngine<F> {
    pub fn new(frontend: F, scale: LoudnessScale, config: AveragingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            frontend,
            scale,
            history: HistoryWindow::new(config.window_seconds, config.window),
            averager: Averager::new(config.mode),
            config,
            current: None,
        })
    }

    /// Pull one frame and fold it into the history.
    ///
    /// Returns `None` without touching any state when the frontend is not
    /// ready yet or has no more frames.
    pub fn tick(&mut self, now_ms: u64) -> Option<TickReport> {
        if !self.frontend.is_ready() {
            return None;
        }
        let frame = self.frontend.next_frame()?;
        let value = compute_loudness(self.scale, &frame.bins);
        Some(self.record_sample(value, now_ms))
    }

    /// Record an already computed loudness value taken at `now_ms`.
    pub fn record_sample(&mut self, value: f64, now_ms: u64) -> TickReport {
        self.history.record(value, now_ms);
        debug_assert!(self.history.is_within_bounds(now_ms));
        self.averager.update(&mut self.history, value);
        self.current = Some(value);

        let average = self.averager.average(&self.history);
        log::trace!(
            "tick t={}ms current={:.3} average={:?} window_len={}",
            now_ms,
            value,
            average,
            self.history.len()
        );

        TickReport {
            time_ms: now_ms,
            current: value,
            average,
            history: self.snapshot(now_ms, average),
        }
    }

    /// Change the window length, dropping all history and cumulative totals.
    pub fn reconfigure(&mut self, window_seconds: u32) -> Result<(), ConfigError> {
        if window_seconds == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        log::info!(
            "Averaging window {}s -> {}s, history cleared",
            self.config.window_seconds,
            window_seconds
        );
        self.config.window_seconds = window_seconds;
        self.history.reconfigure(window_seconds);
        self.averager.restart();
        self.current = None;
        Ok(())
    }

    /// Replace the whole averaging configuration. Clears history.
    #[allow(dead_code)]
    pub fn set_config(&mut self, config: AveragingConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.history = HistoryWindow::new(config.window_seconds, config.window);
        self.averager = Averager::new(config.mode);
        self.current = None;
        Ok(())
    }

    pub fn average(&self) -> Option<f64> {
        self.averager.average(&self.history)
    }

    /// Loudness of the latest tick since the last reconfiguration.
    pub fn current(&self) -> Option<f64> {
        self.current
    }

    pub fn config(&self) -> AveragingConfig {
        self.config
    }

    pub fn scale(&self) -> LoudnessScale {
        self.scale
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    #[cfg(test)]
    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    fn snapshot(&self, now_ms: u64, average: Option<f64>) -> Vec<HistoryPoint> {
        self.history
            .iter()
            .map(|s| HistoryPoint {
                offset_seconds: (s.time_ms as f64 - now_ms as f64) / 1000.0,
                value: s.value,
                // Plain window means carry no per-sample value; chart them flat
                average: match self.config.mode {
                    AverageMode::WindowMean => average,
                    AverageMode::Cumulative | AverageMode::Running => s.average,
                },
            })
            .collect()
    }
}
