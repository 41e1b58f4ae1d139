use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::DisplaySink;
use crate::meter::{LoudnessScale, TickReport};

pub const DEFAULT_CHART_POINTS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time_ms: u64,
    pub current: f64,
    pub average: f64,
}

#[derive(Serialize)]
struct ChartExport<'a> {
    scale: LoudnessScale,
    capacity: usize,
    points: &'a VecDeque<ChartPoint>,
}

/// Last `capacity` (current, average) pairs, as a scrolling line chart keeps them.
pub struct ChartBuffer {
    points: VecDeque<ChartPoint>,
    capacity: usize,
    scale: LoudnessScale,
    output: Option<PathBuf>,
}

impl ChartBuffer {
    pub fn new(scale: LoudnessScale, capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity + 1),
            capacity: capacity.max(1),
            scale,
            output: None,
        }
    }

    /// Write the retained series as JSON to `path` when the run finishes.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    #[allow(dead_code)]
    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.iter()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn to_json(&self) -> Result<String> {
        let export = ChartExport {
            scale: self.scale,
            capacity: self.capacity,
            points: &self.points,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write chart to {}", path.display()))?;
        log::info!("Chart ({} points) written to {}", self.points.len(), path.display());
        Ok(())
    }
}

impl DisplaySink for ChartBuffer {
    fn present(&mut self, report: &TickReport) -> Result<()> {
        let Some(average) = report.average else {
            return Ok(());
        };
        self.points.push_back(ChartPoint {
            time_ms: report.time_ms,
            current: report.current,
            average,
        });
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(path) = self.output.clone() {
            self.write_json(&path)?;
        }
        Ok(())
    }
}
