pub mod average;
pub mod engine;
pub mod history;
pub mod loudness;

use thiserror::Error;

pub use average::AverageMode;
pub use engine::{AveragingConfig, HistoryPoint, LoudnessEngine, TickReport};
pub use history::WindowKind;
pub use loudness::LoudnessScale;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("averaging window must be at least one second")]
    ZeroWindow,

    #[error("averaging window of {0}s is not one of {choices:?}", choices = engine::WINDOW_CHOICES)]
    UnsupportedWindow(u32),

    #[error("invalid window length '{0}'")]
    InvalidWindow(String),

    #[error("invalid window change '{0}', expected AT=SECONDS (e.g. 12.5=30)")]
    InvalidWindowChange(String),
}
