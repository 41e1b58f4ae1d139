use serde::{Deserialize, Serialize};

use super::history::HistoryWindow;

/// Which average the meter reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AverageMode {
    /// Arithmetic mean of every sample in the window
    #[default]
    WindowMean,
    /// Total / count of every sample since the last restart
    Cumulative,
    /// Per-sample running average over the window; the last one is reported
    Running,
}

/// Applies an [`AverageMode`] to a history window after each new sample.
#[derive(Clone, Debug, Default)]
pub struct Averager {
    mode: AverageMode,
    total: f64,
    count: u64,
}

impl Averager {
    pub fn new(mode: AverageMode) -> Self {
        Self {
            mode,
            total: 0.0,
            count: 0,
        }
    }

    /// Forget cumulative totals.
    pub fn restart(&mut self) {
        self.total = 0.0;
        self.count = 0;
    }

    /// Account for the sample just recorded into `window` and annotate it.
    ///
    /// Must be called once per `HistoryWindow::record`.
    pub fn update(&mut self, window: &mut HistoryWindow, value: f64) {
        match self.mode {
            AverageMode::WindowMean => {}
            AverageMode::Cumulative => {
                self.total += value;
                self.count += 1;
                let avg = self.total / self.count as f64;
                if let Some(last) = window.last_mut() {
                    last.average = Some(avg);
                }
            }
            AverageMode::Running => {
                let mut sum = 0.0;
                for (rank, sample) in window.iter_mut().enumerate() {
                    sum += sample.value;
                    sample.average = Some(sum / (rank + 1) as f64);
                }
            }
        }
    }

    /// Current average, or `None` when nothing has been recorded since the
    /// window was last cleared.
    pub fn average(&self, window: &HistoryWindow) -> Option<f64> {
        match self.mode {
            AverageMode::WindowMean => {
                if window.is_empty() {
                    return None;
                }
                let sum: f64 = window.iter().map(|s| s.value).sum();
                Some(sum / window.len() as f64)
            }
            AverageMode::Cumulative => {
                if self.count == 0 {
                    return None;
                }
                Some(self.total / self.count as f64)
            }
            AverageMode::Running => window.last().and_then(|s| s.average),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::history::WindowKind;

    fn feed(avg: &mut Averager, window: &mut HistoryWindow, value: f64, now: u64) -> Option<f64> {
        window.record(value, now);
        avg.update(window, value);
        avg.average(window)
    }

    #[test]
    fn window_mean_of_three() {
        let mut w = HistoryWindow::new(10, WindowKind::Time);
        let mut a = Averager::new(AverageMode::WindowMean);
        for (i, v) in [10.0, 20.0, 30.0].into_iter().enumerate() {
            feed(&mut a, &mut w, v, i as u64 * 100);
        }
        assert_eq!(a.average(&w), Some(20.0));
    }

    #[test]
    fn cumulative_after_each_sample() {
        let mut w = HistoryWindow::new(10, WindowKind::Time);
        let mut a = Averager::new(AverageMode::Cumulative);
        assert_eq!(feed(&mut a, &mut w, 10.0, 0), Some(10.0));
        assert_eq!(feed(&mut a, &mut w, 20.0, 100), Some(15.0));
        assert_eq!(feed(&mut a, &mut w, 30.0, 200), Some(20.0));
        let attached: Vec<_> = w.iter().map(|s| s.average).collect();
        assert_eq!(attached, vec![Some(10.0), Some(15.0), Some(20.0)]);
    }

    #[test]
    fn cumulative_ignores_eviction() {
        let mut w = HistoryWindow::new(1, WindowKind::Time);
        let mut a = Averager::new(AverageMode::Cumulative);
        feed(&mut a, &mut w, 10.0, 0);
        feed(&mut a, &mut w, 20.0, 600);
        let avg = feed(&mut a, &mut w, 30.0, 1_200);
        assert_eq!(w.len(), 2);
        assert_eq!(avg, Some(20.0));
    }

    #[test]
    fn running_average_rescoped_after_eviction() {
        let mut w = HistoryWindow::new(1, WindowKind::Time);
        let mut a = Averager::new(AverageMode::Running);
        assert_eq!(feed(&mut a, &mut w, 10.0, 0), Some(10.0));
        assert_eq!(feed(&mut a, &mut w, 20.0, 600), Some(15.0));
        // 10 falls out of the window here
        let avg = feed(&mut a, &mut w, 30.0, 1_200);
        assert_eq!(w.len(), 2);
        assert_eq!(avg, Some(25.0));
        let series: Vec<_> = w.iter().map(|s| s.average).collect();
        assert_eq!(series, vec![Some(20.0), Some(25.0)]);
    }

    #[test]
    fn empty_window_has_no_average() {
        let w = HistoryWindow::new(5, WindowKind::Count);
        for mode in [AverageMode::WindowMean, AverageMode::Cumulative, AverageMode::Running] {
            assert_eq!(Averager::new(mode).average(&w), None);
        }
    }

    #[test]
    fn restart_forgets_totals() {
        let mut w = HistoryWindow::new(5, WindowKind::Time);
        let mut a = Averager::new(AverageMode::Cumulative);
        feed(&mut a, &mut w, 50.0, 0);
        a.restart();
        assert_eq!(a.average(&w), None);
        assert_eq!(feed(&mut a, &mut w, 10.0, 100), Some(10.0));
    }
}
