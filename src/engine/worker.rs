// Worker pool for parallel copy and transcode jobs

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};

use super::error::JobError;
use super::{Job, JobReport, NO_EXIT_CODE, build_arguments_with_extra, run_ffmpeg};

/// Shared flag that asks running and queued jobs to stop
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a worker needs besides the job itself
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub ffmpeg: PathBuf,
    pub extra_args: Vec<String>,
    /// Kill ffmpeg if a single transcode runs longer than this
    pub job_timeout: Option<Duration>,
    pub cancel: CancelToken,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            extra_args: Vec::new(),
            job_timeout: None,
            cancel: CancelToken::new(),
        }
    }
}

/// Number of workers to use when none is configured
pub fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}

/// Fixed-size pool of worker threads draining a pre-filled job queue
pub struct WorkerPool {
    workers: usize,
    settings: Arc<WorkerSettings>,
}

impl WorkerPool {
    /// Create a pool with default settings
    pub fn new(workers: usize) -> Self {
        Self::with_settings(workers, WorkerSettings::default())
    }

    pub fn with_settings(workers: usize, settings: WorkerSettings) -> Self {
        Self {
            workers: workers.max(1),
            settings: Arc::new(settings),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Queue every job, close the queue and start the workers
    ///
    /// The returned receiver yields exactly one report per job, in completion
    /// order, and closes once every worker has exited.
    pub fn dispatch(&self, jobs: Vec<Job>) -> Receiver<JobReport> {
        let (job_tx, job_rx) = unbounded::<Job>();
        for job in jobs {
            // The receiver is alive until the workers below drop it
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let (report_tx, report_rx) = unbounded::<JobReport>();

        for worker_id in 1..=self.workers {
            let queue = job_rx.clone();
            let reports = report_tx.clone();
            let settings = Arc::clone(&self.settings);
            thread::spawn(move || worker_loop(worker_id, queue, reports, settings));
        }

        report_rx
    }
}

fn worker_loop(
    worker_id: usize,
    queue: Receiver<Job>,
    reports: Sender<JobReport>,
    settings: Arc<WorkerSettings>,
) {
    // Ends once the queue is empty and the sender is gone
    for job in queue.iter() {
        let report = process_job(worker_id, job, &settings);
        if reports.send(report).is_err() {
            break;
        }
    }
    tracing::debug!(worker_id, "worker finished");
}

/// Run one job to its single terminal report
pub fn process_job(worker_id: usize, job: Job, settings: &WorkerSettings) -> JobReport {
    let started = Instant::now();

    let (exit_code, error) = if settings.cancel.is_cancelled() {
        (NO_EXIT_CODE, Some(JobError::Cancelled))
    } else if let Err(e) = ensure_parent_dir(&job.destination) {
        (NO_EXIT_CODE, Some(e))
    } else if job.encode {
        transcode(worker_id, &job, settings)
    } else {
        match copy_file(&job.source, &job.destination) {
            Ok(_) => (0, None),
            Err(e) => {
                remove_partial_output(&job.destination);
                (NO_EXIT_CODE, Some(e))
            }
        }
    };

    let report = JobReport {
        exit_code,
        worker_id,
        job,
        elapsed: started.elapsed(),
        error,
    };

    match &report.error {
        None => tracing::info!(
            worker_id,
            output = %report.job.destination.display(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "job completed"
        ),
        Some(e) => tracing::warn!(
            worker_id,
            source = %report.job.source.display(),
            exit_code = report.exit_code,
            "job failed: {}",
            e
        ),
    }

    report
}

fn ensure_parent_dir(destination: &Path) -> Result<(), JobError> {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| JobError::io("failed to create directory", parent, e)),
        _ => Ok(()),
    }
}

fn copy_file(source: &Path, destination: &Path) -> Result<u64, JobError> {
    let mut input = File::open(source).map_err(|e| JobError::io("failed to open", source, e))?;
    let mut output = File::create(destination)
        .map_err(|e| JobError::io("failed to create", destination, e))?;
    io::copy(&mut input, &mut output).map_err(|e| JobError::io("failed to copy", source, e))
}

fn transcode(worker_id: usize, job: &Job, settings: &WorkerSettings) -> (i32, Option<JobError>) {
    let args = build_arguments_with_extra(&job.format, job, &job.options, &settings.extra_args);
    tracing::debug!(worker_id, ?args, "starting ffmpeg");

    let outcome = match run_ffmpeg(
        &settings.ffmpeg,
        &args,
        worker_id,
        &settings.cancel,
        settings.job_timeout,
    ) {
        Ok(output) if output.exit_code == 0 => return (0, None),
        Ok(output) => (
            output.exit_code,
            JobError::transcode(worker_id, &output.stderr, output.exit_code),
        ),
        Err(e) => (NO_EXIT_CODE, e),
    };

    remove_partial_output(&job.destination);
    (outcome.0, Some(outcome.1))
}

/// A half-written output would look finished to the next run
fn remove_partial_output(destination: &Path) {
    if destination.is_file() {
        if let Err(e) = fs::remove_file(destination) {
            tracing::debug!(
                output = %destination.display(),
                "could not remove partial output: {}",
                e
            );
        }
    }
}
