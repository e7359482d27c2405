use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use super::format::AudioFormat;
use crate::engine::error::JobError;

/// Exit code recorded when a job never reached (or never finished) an ffmpeg process
pub const NO_EXIT_CODE: i32 = -1;

/// Per-run encoder settings, resolved once from the format and user overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Audio bitrate in kbps (0 = let ffmpeg decide)
    pub bitrate: u32,
    /// ffmpeg encoder name (empty = let ffmpeg pick its default)
    pub encoder: String,
}

impl JobOptions {
    /// Resolve options from a format, a bitrate override (0 = none) and the selected encoder
    pub fn resolve(format: &AudioFormat, bitrate_override: u32, encoder: String) -> Self {
        let bitrate = if bitrate_override != 0 {
            bitrate_override
        } else {
            format.preferred_bitrate
        };
        Self { bitrate, encoder }
    }
}

/// What to do with sources that are already lossy
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LossyPolicy {
    /// Copy the original bytes to the output tree
    #[default]
    Copy,
    /// Leave lossy files out of the output tree
    Ignore,
    /// Transcode them like lossless sources (compounds quality loss)
    Reencode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    /// Byte-for-byte copy of an already-lossy source
    Copy,
    /// Run through ffmpeg
    Transcode,
}

/// One file-level unit of work
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// false = copy, true = transcode
    pub encode: bool,
    pub format: AudioFormat,
    pub options: JobOptions,
}

impl Job {
    pub fn copy(
        source: PathBuf,
        destination: PathBuf,
        format: AudioFormat,
        options: JobOptions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            destination,
            encode: false,
            format,
            options,
        }
    }

    pub fn transcode(
        source: PathBuf,
        destination: PathBuf,
        format: AudioFormat,
        options: JobOptions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            destination,
            encode: true,
            format,
            options,
        }
    }

    pub fn kind(&self) -> JobKind {
        if self.encode {
            JobKind::Transcode
        } else {
            JobKind::Copy
        }
    }
}

/// Terminal outcome of a single job
#[derive(Debug)]
pub struct JobReport {
    /// ffmpeg exit code, 0 for a finished copy, NO_EXIT_CODE if no process exit was observed
    pub exit_code: i32,
    pub worker_id: usize,
    pub job: Job,
    pub elapsed: Duration,
    pub error: Option<JobError>,
}

impl JobReport {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}
