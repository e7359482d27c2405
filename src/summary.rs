// Batch outcome aggregation and rendering

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::{JobKind, JobReport};

/// One failed job, flattened for display
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub worker_id: usize,
    pub exit_code: i32,
    pub error: String,
}

/// Aggregate of every report in a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Local>,
    pub format: String,
    /// Empty when ffmpeg picks the encoder
    pub encoder: String,
    pub workers: usize,
    /// Jobs handed to the worker pool
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub copied: usize,
    pub transcoded: usize,
    /// Bytes written by successful jobs
    pub output_bytes: u64,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub failures: Vec<FailureRecord>,
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

impl BatchSummary {
    pub fn new(format: &str, encoder: &str, workers: usize, planned: usize) -> Self {
        Self {
            started_at: Local::now(),
            format: format.to_string(),
            encoder: encoder.to_string(),
            workers,
            planned,
            succeeded: 0,
            failed: 0,
            copied: 0,
            transcoded: 0,
            output_bytes: 0,
            elapsed: Duration::ZERO,
            failures: Vec::new(),
        }
    }

    /// Fold a single report into the totals
    pub fn record(&mut self, report: &JobReport) {
        match &report.error {
            None => {
                self.succeeded += 1;
                match report.job.kind() {
                    JobKind::Copy => self.copied += 1,
                    JobKind::Transcode => self.transcoded += 1,
                }
                self.output_bytes += std::fs::metadata(&report.job.destination)
                    .map(|m| m.len())
                    .unwrap_or(0);
            }
            Some(error) => {
                self.failed += 1;
                self.failures.push(FailureRecord {
                    source: report.job.source.clone(),
                    destination: report.job.destination.clone(),
                    worker_id: report.worker_id,
                    exit_code: report.exit_code,
                    error: error.to_string(),
                });
            }
        }
    }

    /// Number of reports folded in so far
    pub fn received(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.received() == self.planned
    }

    /// Human-readable summary for the terminal
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} succeeded ({} transcoded, {} copied), {} failed, {} written",
            self.succeeded,
            self.transcoded,
            self.copied,
            self.failed,
            format_bytes(self.output_bytes)
        );
        for failure in &self.failures {
            let _ = writeln!(out, "  FAILED {}: {}", failure.source.display(), failure.error);
        }
        let _ = write!(
            out,
            "All files processed in {}",
            format_duration(self.elapsed.as_secs_f64())
        );
        out
    }
}

/// Format bytes as human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format duration in seconds as human-readable time
pub fn format_duration(seconds: f64) -> String {
    let total_secs = seconds as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{:.2}s", seconds)
    }
}
