use serde::{Deserialize, Serialize};

use crate::audio::frontend::BinFormat;

/// Offset added to power-dB loudness so typical levels land above zero.
pub const POWER_DB_OFFSET: f64 = 100.0;

/// How a spectral frame is reduced to one loudness value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LoudnessScale {
    /// Mean of byte magnitudes (0-255)
    #[default]
    Linear,
    /// 20*log10 of the mean byte magnitude
    LinearDb,
    /// RMS of dB power bins, back to dB, plus a display offset
    PowerDb,
}

impl LoudnessScale {
    /// Bin representation the frontend has to deliver for this scale.
    pub fn bin_format(self) -> BinFormat {
        match self {
            LoudnessScale::Linear | LoudnessScale::LinearDb => BinFormat::Byte,
            LoudnessScale::PowerDb => BinFormat::Decibel,
        }
    }

    /// Decimal places used when showing a value of this scale.
    pub fn display_precision(self) -> usize {
        match self {
            LoudnessScale::Linear => 1,
            LoudnessScale::LinearDb | LoudnessScale::PowerDb => 2,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            LoudnessScale::Linear => "",
            LoudnessScale::LinearDb | LoudnessScale::PowerDb => " dB",
        }
    }
}

/// Reduce one frame of bins to a finite loudness value.
///
/// Never returns NaN or infinity: any degenerate result (silence in a dB
/// scale, negative input, NaN bins) collapses to `0.0`.
pub fn compute_loudness(scale: LoudnessScale, bins: &[f32]) -> f64 {
    if bins.is_empty() {
        return 0.0;
    }

    let n = bins.len() as f64;
    let loudness = match scale {
        LoudnessScale::Linear => bins.iter().map(|&b| b as f64).sum::<f64>() / n,
        LoudnessScale::LinearDb => {
            let mean = bins.iter().map(|&b| b as f64).sum::<f64>() / n;
            20.0 * mean.log10()
        }
        LoudnessScale::PowerDb => {
            let mean_power = bins
                .iter()
                .map(|&db| 10f64.powf(db as f64 / 10.0))
                .sum::<f64>()
                / n;
            20.0 * mean_power.sqrt().log10() + POWER_DB_OFFSET
        }
    };

    finite_or_zero(loudness)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
