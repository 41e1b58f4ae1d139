use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use super::DisplaySink;
use crate::meter::{HistoryPoint, TickReport};

#[derive(Serialize)]
struct TickLine<'a> {
    time_ms: u64,
    current: f64,
    average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<&'a [HistoryPoint]>,
}

/// Writes one JSON object per tick.
pub struct JsonLinesDisplay<W: Write> {
    writer: W,
    include_history: bool,
}

impl<W: Write> JsonLinesDisplay<W> {
    pub fn new(writer: W, include_history: bool) -> Self {
        Self {
            writer,
            include_history,
        }
    }

    #[allow(dead_code)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DisplaySink for JsonLinesDisplay<W> {
    fn present(&mut self, report: &TickReport) -> Result<()> {
        let line = TickLine {
            time_ms: report.time_ms,
            current: report.current,
            average: report.average,
            history: self.include_history.then_some(report.history.as_slice()),
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> TickReport {
        TickReport {
            time_ms: 32,
            current: 4.5,
            average: Some(3.0),
            history: vec![
                HistoryPoint { offset_seconds: -0.016, value: 1.5, average: Some(1.5) },
                HistoryPoint { offset_seconds: 0.0, value: 4.5, average: Some(3.0) },
            ],
        }
    }

    #[test]
    fn writes_one_line_per_tick() {
        let mut sink = JsonLinesDisplay::new(Vec::new(), false);
        sink.present(&report()).unwrap();
        sink.present(&report()).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"time_ms":32,"current":4.5,"average":3.0}"#);
    }

    #[test]
    fn history_is_optional() {
        let mut sink = JsonLinesDisplay::new(Vec::new(), true);
        sink.present(&report()).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["history"].as_array().unwrap().len(), 2);
        assert_eq!(value["history"][1]["value"], 4.5);
    }
}
