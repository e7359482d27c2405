// Tests for the worker pool and report collection

use crate::common::helpers::{copy_job, transcode_job};
use audiomirror::engine::worker::{CancelToken, WorkerPool, WorkerSettings};
use audiomirror::engine::{JobError, JobReport, NO_EXIT_CODE};
use std::collections::HashSet;
use tempfile::TempDir;

#[test]
fn test_empty_queue_closes_immediately() {
    let pool = WorkerPool::new(4);
    let reports: Vec<JobReport> = pool.dispatch(Vec::new()).into_iter().collect();
    assert!(reports.is_empty());
}

#[test]
fn test_more_workers_than_jobs() {
    let dir = TempDir::new().unwrap();
    let jobs = vec![copy_job(dir.path(), "only")];

    let reports: Vec<JobReport> = WorkerPool::new(16).dispatch(jobs).into_iter().collect();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].success());
}

#[test]
fn test_workers_keep_going_after_failures() {
    let dir = TempDir::new().unwrap();
    // transcodes against a missing ffmpeg fail, copies succeed
    let settings = WorkerSettings {
        ffmpeg: dir.path().join("no-such-ffmpeg"),
        ..WorkerSettings::default()
    };
    let mut jobs = Vec::new();
    for i in 0..10 {
        jobs.push(transcode_job(dir.path(), &format!("t{}", i)));
        jobs.push(copy_job(dir.path(), &format!("c{}", i)));
    }

    let reports: Vec<JobReport> = WorkerPool::with_settings(1, settings)
        .dispatch(jobs)
        .into_iter()
        .collect();

    assert_eq!(reports.len(), 20);
    let failed: Vec<&JobReport> = reports.iter().filter(|r| !r.success()).collect();
    assert_eq!(failed.len(), 10);
    assert!(failed.iter().all(|r| r.job.encode && r.exit_code == NO_EXIT_CODE));
    assert!(
        failed
            .iter()
            .all(|r| matches!(r.error, Some(JobError::Spawn { .. })))
    );
}

#[cfg(unix)]
mod with_fake_ffmpeg {
    use super::*;
    use crate::common::helpers::fake_ffmpeg;
    use std::fs;
    use std::time::{Duration, Instant};

    fn settings(dir: &std::path::Path) -> WorkerSettings {
        WorkerSettings {
            ffmpeg: fake_ffmpeg(dir),
            ..WorkerSettings::default()
        }
    }

    #[test]
    fn test_one_report_per_job_with_mixed_failures() {
        let dir = TempDir::new().unwrap();
        let mut jobs = Vec::new();
        for i in 0..12 {
            jobs.push(copy_job(dir.path(), &format!("copy{}", i)));
            let name = if i % 3 == 0 {
                format!("fail{}", i)
            } else {
                format!("ok{}", i)
            };
            jobs.push(transcode_job(dir.path(), &name));
        }
        let ids: HashSet<_> = jobs.iter().map(|j| j.id).collect();

        let pool = WorkerPool::with_settings(3, settings(dir.path()));
        let reports: Vec<JobReport> = pool.dispatch(jobs).into_iter().collect();

        assert_eq!(reports.len(), 24);
        let seen: HashSet<_> = reports.iter().map(|r| r.job.id).collect();
        assert_eq!(seen, ids);

        let failed: Vec<&JobReport> = reports.iter().filter(|r| !r.success()).collect();
        assert_eq!(failed.len(), 4);
        for report in failed {
            assert_eq!(report.exit_code, 1);
            assert!(!report.job.destination.exists());
        }
        for report in reports.iter().filter(|r| r.success() && r.job.encode) {
            assert_eq!(fs::read(&report.job.destination).unwrap(), b"encoded");
        }
    }

    #[test]
    fn test_transcode_failure_message() {
        let dir = TempDir::new().unwrap();
        let pool = WorkerPool::with_settings(1, settings(dir.path()));
        let reports: Vec<JobReport> = pool
            .dispatch(vec![transcode_job(dir.path(), "fail")])
            .into_iter()
            .collect();

        let error = reports[0].error.as_ref().unwrap().to_string();
        assert_eq!(
            error,
            "worker 1's execution failed: ffmpeg: Invalid data found when processing input Conversion failed!, exit code: 1"
        );
    }

    #[test]
    fn test_jobs_run_in_parallel() {
        let dir = TempDir::new().unwrap();
        let mut jobs = Vec::new();
        for i in 0..50 {
            jobs.push(copy_job(dir.path(), &format!("fast{}", i)));
            jobs.push(transcode_job(dir.path(), &format!("slow{}", i)));
        }

        let pool = WorkerPool::with_settings(4, settings(dir.path()));
        let started = Instant::now();
        let reports: Vec<JobReport> = pool.dispatch(jobs).into_iter().collect();
        let wall = started.elapsed();

        assert_eq!(reports.len(), 100);
        assert!(reports.iter().all(|r| r.success()));

        let busy: Duration = reports.iter().map(|r| r.elapsed).sum();
        assert!(
            wall < busy.mul_f64(0.6),
            "wall clock {:?} vs summed job time {:?}",
            wall,
            busy
        );

        let workers: HashSet<usize> = reports.iter().map(|r| r.worker_id).collect();
        assert!(workers.len() > 1, "only {:?} did any work", workers);
    }

    #[test]
    fn test_cancel_mid_batch_still_reports_everything() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let settings = WorkerSettings {
            cancel: cancel.clone(),
            ..settings(dir.path())
        };
        let jobs: Vec<_> = (0..20)
            .map(|i| transcode_job(dir.path(), &format!("slow{}", i)))
            .collect();

        let rx = WorkerPool::with_settings(2, settings).dispatch(jobs);
        let first = rx.recv().unwrap();
        cancel.cancel();
        let rest: Vec<JobReport> = rx.into_iter().collect();

        assert_eq!(rest.len() + 1, 20);
        assert!(first.success());
        assert!(
            rest.iter()
                .any(|r| matches!(r.error, Some(JobError::Cancelled)))
        );
    }

    #[test]
    fn test_job_timeout_kills_ffmpeg() {
        let dir = TempDir::new().unwrap();
        let settings = WorkerSettings {
            job_timeout: Some(Duration::from_millis(20)),
            ..settings(dir.path())
        };
        let reports: Vec<JobReport> = WorkerPool::with_settings(1, settings)
            .dispatch(vec![transcode_job(dir.path(), "slow")])
            .into_iter()
            .collect();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].exit_code, NO_EXIT_CODE);
        assert!(matches!(reports[0].error, Some(JobError::TimedOut { .. })));
    }
}
