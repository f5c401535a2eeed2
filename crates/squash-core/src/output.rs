//! Report output in JSON or JSON Lines, plus batch summaries.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::Duration;

use crate::types::FileRecord;

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl ReportFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes records to JSON or JSONL.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: ReportFormat,
    records_written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// Create a new report writer over `writer`.
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self {
            writer,
            format,
            records_written: 0,
        }
    }

    /// Write a single record as one line.
    pub fn write<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.records_written += 1;
        Ok(())
    }

    /// Write a batch: a pretty array for JSON, one line per record for JSONL.
    pub fn write_all<T: Serialize>(&mut self, records: &[T]) -> io::Result<()> {
        match self.format {
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut self.writer, records)
                    .map_err(io::Error::other)?;
                writeln!(self.writer)?;
                self.records_written += records.len();
            }
            ReportFormat::JsonLines => {
                for record in records {
                    self.write(record)?;
                }
            }
        }
        Ok(())
    }

    /// Number of records written.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Totals for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Files handed to the pipeline
    pub files: usize,
    /// Files passed through unchanged
    pub bypassed: usize,
    /// Files rejected before compression
    pub rejected: usize,
    /// Total input bytes
    pub input_bytes: u64,
    /// Total output bytes
    pub output_bytes: u64,
    /// Wall time in milliseconds
    pub elapsed_ms: u64,
}

impl BatchSummary {
    /// Start a summary from the input files.
    pub fn new(input_bytes: u64, files: usize, bypassed: usize, rejected: usize) -> Self {
        Self {
            files,
            bypassed,
            rejected,
            input_bytes,
            ..Default::default()
        }
    }

    /// Record the outputs and elapsed time.
    pub fn finish(&mut self, outputs: &[FileRecord], elapsed: Duration) {
        self.output_bytes = outputs.iter().map(|r| r.size).sum();
        self.elapsed_ms = elapsed.as_millis() as u64;
    }

    /// Output size as a fraction of input size (1.0 when there is no input).
    pub fn ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            1.0
        } else {
            self.output_bytes as f64 / self.input_bytes as f64
        }
    }
}
