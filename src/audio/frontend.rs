use std::path::PathBuf;

use thiserror::Error;

/// Representation of the bins in a [`SpectralFrame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinFormat {
    /// Unsigned magnitudes mapped onto 0-255
    Byte,
    /// Power in decibels, `-inf` for silent bins
    Decibel,
}

/// One snapshot of frequency-bin magnitudes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpectralFrame {
    pub bins: Vec<f32>,
}

impl SpectralFrame {
    pub fn new(bins: Vec<f32>) -> Self {
        Self { bins }
    }
}

/// Source of spectral frames, pulled once per tick.
pub trait AudioFrontend {
    /// False until the source can deliver frames.
    fn is_ready(&self) -> bool;

    /// Number of bins in every frame.
    fn bin_count(&self) -> usize;

    /// Next frame, or `None` once the source has stopped.
    fn next_frame(&mut self) -> Option<SpectralFrame>;
}

#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("failed to open audio source {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported audio source: {0}")]
    Unsupported(#[from] symphonia::core::errors::Error),

    #[error("no audio track found")]
    NoTrack,

    #[error("unknown sample rate")]
    UnknownSampleRate,

    #[error("invalid analyser setting: {0}")]
    InvalidSetting(String),
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::collections::VecDeque;

    use super::{AudioFrontend, SpectralFrame};

    /// Frontend that replays a fixed list of frames.
    pub struct ScriptedFrontend {
        pub ready: bool,
        frames: VecDeque<SpectralFrame>,
    }

    impl ScriptedFrontend {
        pub fn new(frames: Vec<SpectralFrame>) -> Self {
            Self {
                ready: true,
                frames: frames.into(),
            }
        }

        /// One frame per value, every bin set to that value.
        pub fn constant(values: &[f32]) -> Self {
            Self::new(values.iter().map(|&v| SpectralFrame::new(vec![v; 8])).collect())
        }
    }

    impl AudioFrontend for ScriptedFrontend {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn bin_count(&self) -> usize {
            self.frames.front().map_or(0, |f| f.bins.len())
        }

        fn next_frame(&mut self) -> Option<SpectralFrame> {
            self.frames.pop_front()
        }
    }
}
