// Error types: fatal run errors and per-job errors

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a run before the worker pool starts
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("unknown format {0}")]
    FormatNotFound(String),

    #[error("failed to list ffmpeg encoders: {0}")]
    Probe(String),

    #[error(
        "an ffmpeg encoder for {format} was not found; please ensure your ffmpeg binary is built with a supported encoder ({})",
        .preferences.join(", ")
    )]
    NoEncoderAvailable {
        format: String,
        preferences: Vec<String>,
    },

    #[error("source directory {} is not a readable directory", .0.display())]
    InvalidRoot(PathBuf),

    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Errors recorded in a single job's report
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {worker_id} failed to start ffmpeg: {source}")]
    Spawn {
        worker_id: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {worker_id}'s execution failed: ffmpeg: {stderr}, exit code: {exit_code}")]
    Transcode {
        worker_id: usize,
        stderr: String,
        exit_code: i32,
    },

    #[error("cancelled before completion")]
    Cancelled,

    #[error("ffmpeg did not finish within {}s", .after.as_secs())]
    TimedOut { after: Duration },
}

impl JobError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Build a transcode failure, flattening ffmpeg's diagnostic text onto one line
    pub fn transcode(worker_id: usize, stderr: &str, exit_code: i32) -> Self {
        Self::Transcode {
            worker_id,
            stderr: flatten_diagnostics(stderr),
            exit_code,
        }
    }
}

fn flatten_diagnostics(text: &str) -> String {
    text.trim_end()
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}
