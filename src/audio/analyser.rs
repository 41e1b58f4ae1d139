use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Deserialize;

use super::decode::AudioData;
use super::frontend::{AudioFrontend, BinFormat, FrontendError, SpectralFrame};

const BLACKMAN_ALPHA: f32 = 0.16;

/// Spectrum analyser parameters, matching the usual browser analyser defaults.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct AnalyserSettings {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing_time_constant: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            smoothing_time_constant: default_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

fn default_fft_size() -> usize { 256 }
fn default_smoothing() -> f32 { 0.8 }
fn default_min_decibels() -> f32 { -100.0 }
fn default_max_decibels() -> f32 { -30.0 }

impl AnalyserSettings {
    pub fn validate(&self) -> Result<(), FrontendError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(FrontendError::InvalidSetting(format!(
                "fft size must be a power of two in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(FrontendError::InvalidSetting(format!(
                "smoothing time constant must be within 0..=1, got {}",
                self.smoothing_time_constant
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(FrontendError::InvalidSetting(format!(
                "min decibels ({}) must be below max decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Replays a decoded signal through a windowed, smoothed FFT one tick at a time.
pub struct AnalyserFrontend {
    samples: Vec<f32>,
    samples_per_tick: f64,
    tick: u64,
    format: BinFormat,
    settings: AnalyserSettings,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    smoothed: Vec<f32>,
}

impl AnalyserFrontend {
    pub fn new(
        audio: AudioData,
        tick_rate: u32,
        format: BinFormat,
        settings: AnalyserSettings,
    ) -> Result<Self, FrontendError> {
        settings.validate()?;
        if tick_rate == 0 {
            return Err(FrontendError::InvalidSetting("tick rate must be positive".into()));
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(settings.fft_size);

        log::debug!(
            "Analyser: fft_size={}, bins={}, {:.1} samples/tick, format={:?}",
            settings.fft_size,
            settings.bin_count(),
            audio.sample_rate as f64 / tick_rate as f64,
            format
        );

        Ok(Self {
            samples_per_tick: audio.sample_rate as f64 / tick_rate as f64,
            samples: audio.samples,
            tick: 0,
            format,
            window: blackman_window(settings.fft_size),
            fft,
            smoothed: vec![0.0; settings.bin_count()],
            settings,
        })
    }

    /// Total number of frames this source will deliver.
    pub fn frame_count(&self) -> u64 {
        (self.samples.len() as f64 / self.samples_per_tick).ceil() as u64
    }

    fn analyse(&mut self, end: usize) {
        let n = self.settings.fft_size;
        let mut buffer: Vec<Complex<f32>> = (0..n)
            .map(|i| {
                let sample = (end + i)
                    .checked_sub(n)
                    .and_then(|idx| self.samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                Complex::new(sample * self.window[i], 0.0)
            })
            .collect();
        self.fft.process(&mut buffer);

        let tau = self.settings.smoothing_time_constant;
        let scale = 1.0 / n as f32;
        for (prev, c) in self.smoothed.iter_mut().zip(buffer.iter()) {
            let magnitude = c.norm() * scale;
            let next = tau * *prev + (1.0 - tau) * magnitude;
            // Keep NaN/inf out of the smoothing state
            *prev = if next.is_finite() { next } else { 0.0 };
        }
    }

    fn to_decibels(&self) -> Vec<f32> {
        self.smoothed.iter().map(|&x| 20.0 * x.log10()).collect()
    }

    fn to_bytes(&self) -> Vec<f32> {
        let min = self.settings.min_decibels;
        let range = self.settings.max_decibels - min;
        self.smoothed
            .iter()
            .map(|&x| {
                let db = 20.0 * x.log10();
                (255.0 / range * (db - min)).floor().max(0.0).min(255.0)
            })
            .collect()
    }
}

impl AudioFrontend for AnalyserFrontend {
    fn is_ready(&self) -> bool {
        true
    }

    fn bin_count(&self) -> usize {
        self.settings.bin_count()
    }

    fn next_frame(&mut self) -> Option<SpectralFrame> {
        let start = (self.tick as f64 * self.samples_per_tick) as usize;
        if start >= self.samples.len() {
            return None;
        }
        let end = ((self.tick + 1) as f64 * self.samples_per_tick) as usize;
        self.tick += 1;

        self.analyse(end);
        let bins = match self.format {
            BinFormat::Byte => self.to_bytes(),
            BinFormat::Decibel => self.to_decibels(),
        };
        Some(SpectralFrame::new(bins))
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let a0 = (1.0 - BLACKMAN_ALPHA) / 2.0;
    let a1 = 0.5;
    let a2 = BLACKMAN_ALPHA / 2.0;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}
