use std::collections::VecDeque;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::audio::frontend::AudioFrontend;
use crate::display::DisplaySink;
use crate::meter::engine::WINDOW_CHOICES;
use crate::meter::{ConfigError, LoudnessEngine};

/// Source of tick timestamps.
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Wait for (or jump to) the next tick.
    fn advance(&mut self);
}

/// Steps a fixed frame period per tick without sleeping.
pub struct VirtualClock {
    tick_rate: u32,
    tick: u64,
}

impl VirtualClock {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate: tick_rate.max(1),
            tick: 0,
        }
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.tick * 1000 / self.tick_rate as u64
    }

    fn advance(&mut self) {
        self.tick += 1;
    }
}

/// Paces ticks against the wall clock.
pub struct WallClock {
    start: Instant,
    period: Duration,
    tick: u32,
}

impl WallClock {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            start: Instant::now(),
            period: Duration::from_secs(1) / tick_rate.max(1),
            tick: 0,
        }
    }
}

impl Clock for WallClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn advance(&mut self) {
        self.tick = self.tick.saturating_add(1);
        let deadline = self.start + self.period * self.tick;
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// A change of the averaging window at a point in the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowChange {
    pub at_ms: u64,
    pub window_seconds: u32,
}

impl FromStr for WindowChange {
    type Err = ConfigError;

    /// Parses `AT=SECONDS`, where `AT` is in seconds since the start of the run.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidWindowChange(s.to_string());
        let (at, secs) = s.split_once('=').ok_or_else(invalid)?;
        let at: f64 = at.trim().parse().map_err(|_| invalid())?;
        let window_seconds: u32 = secs.trim().parse().map_err(|_| invalid())?;
        if !at.is_finite() || at < 0.0 {
            return Err(invalid());
        }
        if !WINDOW_CHOICES.contains(&window_seconds) {
            return Err(ConfigError::UnsupportedWindow(window_seconds));
        }
        Ok(Self {
            at_ms: (at * 1000.0).round() as u64,
            window_seconds,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStats {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub reconfigurations: u32,
}

/// Drives an engine one tick per clock step until the frontend runs dry.
pub struct TickLoop<C> {
    clock: C,
    changes: VecDeque<WindowChange>,
    idle_limit: u64,
}

impl<C: Clock> TickLoop<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            changes: VecDeque::new(),
            idle_limit: u64::MAX,
        }
    }

    pub fn with_window_changes(mut self, mut changes: Vec<WindowChange>) -> Self {
        changes.sort_by_key(|c| c.at_ms);
        self.changes = changes.into();
        self
    }

    /// Give up after this many consecutive ticks with the frontend not ready.
    pub fn with_idle_limit(mut self, ticks: u64) -> Self {
        self.idle_limit = ticks;
        self
    }

    pub fn run<F: AudioFrontend>(
        &mut self,
        engine: &mut LoudnessEngine<F>,
        sinks: &mut [Box<dyn DisplaySink>],
    ) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let mut idle_streak = 0u64;

        loop {
            let now = self.clock.now_ms();

            while let Some(change) = self.changes.front().copied() {
                if change.at_ms > now {
                    break;
                }
                self.changes.pop_front();
                engine.reconfigure(change.window_seconds)?;
                stats.reconfigurations += 1;
            }

            if !engine.frontend().is_ready() {
                idle_streak += 1;
                stats.idle_ticks += 1;
                if idle_streak >= self.idle_limit {
                    log::warn!("Audio frontend not ready after {} ticks, giving up", idle_streak);
                    break;
                }
                self.clock.advance();
                continue;
            }
            idle_streak = 0;

            let Some(report) = engine.tick(now) else {
                log::debug!("Audio frontend exhausted at {}ms", now);
                break;
            };

            for sink in sinks.iter_mut() {
                sink.present(&report)?;
            }
            stats.ticks += 1;

            self.clock.advance();
        }

        for sink in sinks.iter_mut() {
            sink.finish()?;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::audio::frontend::scripted::ScriptedFrontend;
    use crate::meter::{AverageMode, AveragingConfig, LoudnessScale, TickReport, WindowKind};

    /// Sink that keeps every report it sees.
    #[derive(Clone, Default)]
    struct Recorder {
        reports: Rc<RefCell<Vec<TickReport>>>,
        finished: Rc<RefCell<bool>>,
    }

    impl DisplaySink for Recorder {
        fn present(&mut self, report: &TickReport) -> Result<()> {
            self.reports.borrow_mut().push(report.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            *self.finished.borrow_mut() = true;
            Ok(())
        }
    }

    fn engine(values: &[f32], mode: AverageMode) -> LoudnessEngine<ScriptedFrontend> {
        let config = AveragingConfig {
            window_seconds: 10,
            window: WindowKind::Time,
            mode,
        };
        LoudnessEngine::new(ScriptedFrontend::constant(values), LoudnessScale::Linear, config).unwrap()
    }

    #[test]
    fn virtual_clock_steps_frame_period() {
        let mut clock = VirtualClock::new(60);
        let mut times = Vec::new();
        for _ in 0..4 {
            times.push(clock.now_ms());
            clock.advance();
        }
        assert_eq!(times, vec![0, 16, 33, 50]);
    }

    #[test]
    fn parses_window_change() {
        let change: WindowChange = "12.5=30".parse().unwrap();
        assert_eq!(change, WindowChange { at_ms: 12_500, window_seconds: 30 });
        assert_eq!("1=7".parse::<WindowChange>(), Err(ConfigError::UnsupportedWindow(7)));
        assert!(matches!(
            "soon=30".parse::<WindowChange>(),
            Err(ConfigError::InvalidWindowChange(_))
        ));
        assert!("-1=30".parse::<WindowChange>().is_err());
        assert!("30".parse::<WindowChange>().is_err());
    }

    #[test]
    fn runs_until_frontend_is_exhausted() {
        let mut e = engine(&[10.0, 20.0, 30.0], AverageMode::WindowMean);
        let recorder = Recorder::default();
        let mut sinks: Vec<Box<dyn DisplaySink>> = vec![Box::new(recorder.clone())];

        let stats = TickLoop::new(VirtualClock::new(10)).run(&mut e, &mut sinks).unwrap();

        assert_eq!(stats.ticks, 3);
        assert_eq!(e.current(), Some(30.0));
        assert_eq!(e.average(), Some(20.0));
        let times: Vec<_> = recorder.reports.borrow().iter().map(|r| r.time_ms).collect();
        assert_eq!(times, vec![0, 100, 200]);
        assert!(*recorder.finished.borrow());
    }

    #[test]
    fn scheduled_change_restarts_average() {
        let mut e = engine(&[10.0, 20.0, 30.0, 40.0], AverageMode::Cumulative);
        let recorder = Recorder::default();
        let mut sinks: Vec<Box<dyn DisplaySink>> = vec![Box::new(recorder.clone())];

        let changes = vec![WindowChange { at_ms: 200, window_seconds: 5 }];
        let stats = TickLoop::new(VirtualClock::new(10))
            .with_window_changes(changes)
            .run(&mut e, &mut sinks)
            .unwrap();

        assert_eq!(stats.reconfigurations, 1);
        let averages: Vec<_> = recorder.reports.borrow().iter().map(|r| r.average).collect();
        assert_eq!(averages, vec![Some(10.0), Some(15.0), Some(30.0), Some(35.0)]);
        assert_eq!(e.config().window_seconds, 5);
    }

    #[test]
    fn gives_up_when_frontend_never_ready() {
        let mut e = engine(&[10.0], AverageMode::WindowMean);
        e.frontend_mut().ready = false;
        let mut sinks: Vec<Box<dyn DisplaySink>> = Vec::new();

        let stats = TickLoop::new(VirtualClock::new(60))
            .with_idle_limit(5)
            .run(&mut e, &mut sinks)
            .unwrap();

        assert_eq!(stats.ticks, 0);
        assert_eq!(stats.idle_ticks, 5);
        assert!(e.history().is_empty());
    }
}
