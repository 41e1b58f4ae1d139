use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Entries kept per configured second in count-capped windows.
pub const SAMPLES_PER_WINDOW_SECOND: usize = 10;

/// How the history window forgets old samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WindowKind {
    /// Drop samples older than `window_seconds` of elapsed time
    #[default]
    Time,
    /// Keep the newest `window_seconds * 10` samples, whatever their age
    Count,
}

/// One loudness reading.
#[derive(Clone, Debug, PartialEq)]
pub struct LoudnessSample {
    pub time_ms: u64,
    pub value: f64,
    /// Running or cumulative average attached by the averaging policy
    pub average: Option<f64>,
}

/// Bounded, timestamp-ordered history of recent loudness samples.
#[derive(Clone, Debug)]
pub struct HistoryWindow {
    samples: VecDeque<LoudnessSample>,
    window_seconds: u32,
    kind: WindowKind,
}

impl HistoryWindow {
    pub fn new(window_seconds: u32, kind: WindowKind) -> Self {
        Self {
            samples: VecDeque::new(),
            window_seconds,
            kind,
        }
    }

    /// Append a sample taken at `now_ms` and evict whatever falls outside the window.
    pub fn record(&mut self, value: f64, now_ms: u64) {
        self.samples.push_back(LoudnessSample {
            time_ms: now_ms,
            value,
            average: None,
        });
        self.evict(now_ms);
    }

    /// Change the window length. Clears all history.
    pub fn reconfigure(&mut self, window_seconds: u32) {
        self.window_seconds = window_seconds;
        self.samples.clear();
    }

    fn evict(&mut self, now_ms: u64) {
        match self.kind {
            WindowKind::Time => {
                let cutoff = now_ms.saturating_sub(self.span_ms());
                while self.samples.front().is_some_and(|s| s.time_ms < cutoff) {
                    self.samples.pop_front();
                }
            }
            WindowKind::Count => {
                let cap = self.capacity();
                while self.samples.len() > cap {
                    self.samples.pop_front();
                }
            }
        }
    }

    /// Whether every retained sample satisfies the eviction rule at `now_ms`.
    pub fn is_within_bounds(&self, now_ms: u64) -> bool {
        match self.kind {
            WindowKind::Time => {
                let cutoff = now_ms.saturating_sub(self.span_ms());
                self.samples.iter().all(|s| s.time_ms >= cutoff)
            }
            WindowKind::Count => self.samples.len() <= self.capacity(),
        }
    }

    pub fn span_ms(&self) -> u64 {
        self.window_seconds as u64 * 1000
    }

    pub fn capacity(&self) -> usize {
        self.window_seconds as usize * SAMPLES_PER_WINDOW_SECOND
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoudnessSample> {
        self.samples.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LoudnessSample> {
        self.samples.iter_mut()
    }

    pub fn last(&self) -> Option<&LoudnessSample> {
        self.samples.back()
    }

    pub fn last_mut(&mut self) -> Option<&mut LoudnessSample> {
        self.samples.back_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_window_drops_stale_samples() {
        let mut h = HistoryWindow::new(5, WindowKind::Time);
        for t in (0..=12_000).step_by(500) {
            h.record(1.0, t);
            assert!(h.is_within_bounds(t));
        }
        assert_eq!(h.iter().next().unwrap().time_ms, 7_000);
        assert_eq!(h.len(), 11);
    }

    #[test]
    fn time_window_keeps_sample_exactly_at_cutoff() {
        let mut h = HistoryWindow::new(1, WindowKind::Time);
        h.record(1.0, 0);
        h.record(2.0, 1_000);
        assert_eq!(h.len(), 2);
        h.record(3.0, 1_001);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn count_window_caps_length_regardless_of_time() {
        let mut h = HistoryWindow::new(1, WindowKind::Count);
        // Ticks spread over a long real time still only keep 10 entries
        for i in 0..25u64 {
            h.record(i as f64, i * 10_000);
            assert!(h.len() <= 10);
        }
        assert_eq!(h.len(), 10);
        assert_eq!(h.iter().next().unwrap().value, 15.0);

        // Bursts faster than real time are capped the same way
        let mut h = HistoryWindow::new(1, WindowKind::Count);
        for _ in 0..25 {
            h.record(1.0, 0);
        }
        assert_eq!(h.len(), 10);
    }

    #[test]
    fn reconfigure_clears() {
        let mut h = HistoryWindow::new(10, WindowKind::Time);
        h.record(1.0, 0);
        h.record(2.0, 100);
        h.reconfigure(30);
        assert!(h.is_empty());
        assert_eq!(h.span_ms(), 30_000);
    }

    #[test]
    fn early_timestamps_do_not_underflow() {
        let mut h = HistoryWindow::new(60, WindowKind::Time);
        h.record(1.0, 5);
        assert_eq!(h.len(), 1);
    }
}
