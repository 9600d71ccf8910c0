use std::io::Write;

use serde_json::json;

use crate::config::OutputFormat;
use crate::metrics::Summary;
use crate::simulator::Event;
use crate::utils::prelude::*;

/// Writes events and the final summary in the configured format
pub struct Renderer<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> Renderer<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Renderer { writer, format }
    }

    pub fn event(&mut self, event: &Event) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.writer, "{}", event)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, event)?;
                self.writer.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    pub fn summary(&mut self, summary: &Summary) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.writer, "{}", summary)?,
            OutputFormat::Json => {
                let line = json!({
                    "event": "SUMMARY",
                    "mean_turnaround": summary.mean_turnaround,
                    "max_overhead": round2(summary.max_overhead),
                    "mean_overhead": round2(summary.mean_overhead),
                    "makespan": summary.makespan,
                });
                serde_json::to_writer(&mut self.writer, &line)?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Same precision as the text summary
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
