pub mod chart;
pub mod console;
pub mod jsonl;

use anyhow::Result;

use crate::meter::{LoudnessScale, TickReport};

pub use chart::ChartBuffer;
pub use console::ConsoleDisplay;
pub use jsonl::JsonLinesDisplay;

/// Shown in place of an average that does not exist yet.
pub const PLACEHOLDER: &str = "--";

/// Consumer of per-tick engine output.
pub trait DisplaySink {
    fn present(&mut self, report: &TickReport) -> Result<()>;

    /// Called once after the last tick.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Format a loudness value for display at the precision of `scale`.
pub fn format_loudness(scale: LoudnessScale, value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.*}{}", scale.display_precision(), v, scale.unit()),
        None => PLACEHOLDER.to_string(),
    }
}
