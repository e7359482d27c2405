// Single entry point: resolve format and encoder, plan, dispatch, collect

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::error::MirrorError;
use super::worker::{CancelToken, WorkerPool, WorkerSettings, default_worker_count};
use super::{
    AudioFormat, EncoderChoice, EncoderSource, FfmpegEncoders, Job, JobOptions, JobReport,
    LossyPolicy, lookup_format, plan_jobs_with_policy, select_for_format,
};
use crate::summary::BatchSummary;

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub format: String,
    /// Directory-name substrings whose files are left out
    pub blacklist: Vec<String>,
    /// None = one worker per available CPU
    pub workers: Option<usize>,
    /// kbps, 0 = the format's preferred bitrate
    pub bitrate: u32,
    pub lossy_policy: LossyPolicy,
    pub ffmpeg: PathBuf,
    pub extra_args: Vec<String>,
    pub job_timeout: Option<Duration>,
    pub cancel: CancelToken,
}

impl BatchConfig {
    pub fn new(
        source_root: impl Into<PathBuf>,
        dest_root: impl Into<PathBuf>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            format: format.into(),
            blacklist: Vec::new(),
            workers: None,
            bitrate: 0,
            lossy_policy: LossyPolicy::default(),
            ffmpeg: PathBuf::from("ffmpeg"),
            extra_args: Vec::new(),
            job_timeout: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn worker_count(&self) -> usize {
        match self.workers {
            Some(n) if n > 0 => n,
            _ => default_worker_count(),
        }
    }

    fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            ffmpeg: self.ffmpeg.clone(),
            extra_args: self.extra_args.clone(),
            job_timeout: self.job_timeout,
            cancel: self.cancel.clone(),
        }
    }
}

/// A planned batch that has not started yet
#[derive(Debug)]
pub struct PreparedBatch {
    pub format: AudioFormat,
    pub encoder: EncoderChoice,
    pub options: JobOptions,
    pub jobs: Vec<Job>,
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve the format and encoder and plan every job; no files are written
pub fn prepare_batch(
    config: &BatchConfig,
    encoders: &dyn EncoderSource,
) -> Result<PreparedBatch, MirrorError> {
    let format = lookup_format(&config.format)?;
    let encoder = select_for_format(&format, encoders)?;
    let options = JobOptions::resolve(&format, config.bitrate, encoder.encoder.clone());

    let jobs = plan_jobs_with_policy(
        &absolute(&config.source_root),
        &absolute(&config.dest_root),
        &format,
        &options,
        &config.blacklist,
        config.lossy_policy,
    )?;

    Ok(PreparedBatch {
        format,
        encoder,
        options,
        jobs,
    })
}

/// Run a prepared batch to completion, calling `on_report` as each job finishes
pub fn execute_batch<F>(
    prepared: PreparedBatch,
    config: &BatchConfig,
    mut on_report: F,
) -> BatchSummary
where
    F: FnMut(&JobReport),
{
    let pool = WorkerPool::with_settings(config.worker_count(), config.worker_settings());
    let planned = prepared.jobs.len();
    let mut summary = BatchSummary::new(
        prepared.format.name,
        &prepared.options.encoder,
        pool.workers(),
        planned,
    );

    tracing::info!(
        jobs = planned,
        workers = pool.workers(),
        "{} jobs added to the job queue",
        planned
    );

    let started = Instant::now();
    for report in pool.dispatch(prepared.jobs) {
        on_report(&report);
        summary.record(&report);
    }
    summary.elapsed = started.elapsed();

    if summary.received() != planned {
        tracing::error!(
            planned,
            received = summary.received(),
            "worker pool lost job reports"
        );
    }

    summary
}

/// Mirror `config.source_root` into `config.dest_root` using a fixed encoder source
pub fn run_batch_with<F>(
    config: &BatchConfig,
    encoders: &dyn EncoderSource,
    on_report: F,
) -> Result<BatchSummary, MirrorError>
where
    F: FnMut(&JobReport),
{
    let prepared = prepare_batch(config, encoders)?;
    Ok(execute_batch(prepared, config, on_report))
}

/// Mirror `config.source_root` into `config.dest_root`, probing ffmpeg for encoders
///
/// Fatal problems (unknown format, failed probe, no usable encoder, failed walk)
/// are returned before any job starts. Per-job failures end up in the summary.
pub fn run_batch(config: &BatchConfig) -> Result<BatchSummary, MirrorError> {
    let encoders = FfmpegEncoders::new(&config.ffmpeg);
    run_batch_with(config, &encoders, |_| {})
}
