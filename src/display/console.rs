use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use super::{format_loudness, DisplaySink};
use crate::meter::{LoudnessScale, TickReport};

/// Terminal meter: a progress bar whose message carries the live readings.
pub struct ConsoleDisplay {
    pb: ProgressBar,
    scale: LoudnessScale,
}

impl ConsoleDisplay {
    pub fn new(scale: LoudnessScale, total_ticks: Option<u64>) -> Result<Self> {
        let pb = match total_ticks {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} ticks  {msg}")?
                        .progress_chars("=>-"),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(ProgressStyle::default_spinner().template("{spinner} [{elapsed_precise}] {msg}")?);
                pb
            }
        };
        Ok(Self { pb, scale })
    }

    fn message(&self, report: &TickReport) -> String {
        format!(
            "current {}  average {}",
            format_loudness(self.scale, Some(report.current)),
            format_loudness(self.scale, report.average)
        )
    }
}

impl DisplaySink for ConsoleDisplay {
    fn present(&mut self, report: &TickReport) -> Result<()> {
        self.pb.set_message(self.message(report));
        self.pb.inc(1);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.pb.finish();
        Ok(())
    }
}
