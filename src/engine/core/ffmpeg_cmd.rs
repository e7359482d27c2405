use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::format::AudioFormat;
use super::types::{Job, JobOptions, NO_EXIT_CODE};
use crate::engine::error::JobError;
use crate::engine::worker::CancelToken;

/// How often a running ffmpeg is checked for exit, cancellation or timeout
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Build the ffmpeg arguments for a transcode job
pub fn build_arguments(format: &AudioFormat, job: &Job, options: &JobOptions) -> Vec<OsString> {
    build_arguments_with_extra(format, job, options, &[])
}

/// Build the ffmpeg arguments, appending user-supplied `extra` arguments after the
/// format's own container arguments
pub fn build_arguments_with_extra(
    format: &AudioFormat,
    job: &Job,
    options: &JobOptions,
    extra: &[String],
) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-loglevel", "error", "-y", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(job.source.clone().into_os_string());

    if options.bitrate != 0 {
        args.push("-b:a".into());
        args.push(format!("{}k", options.bitrate).into());
    }

    if !options.encoder.is_empty() {
        args.push("-c:a".into());
        args.push(options.encoder.as_str().into());
    }

    // Some containers only behave when these sit right after the codec flags
    args.extend(format.ffmpeg_args.iter().map(OsString::from));
    args.extend(extra.iter().map(OsString::from));

    // Keep tags from the source
    for arg in ["-map_metadata", "0", "-id3v2_version", "3"] {
        args.push(arg.into());
    }
    args.push(job.destination.clone().into_os_string());

    args
}

/// Split a user-provided argument string shell-style, respecting quotes
pub fn split_extra_args(additional_args: &str) -> Vec<String> {
    if additional_args.trim().is_empty() {
        return Vec::new();
    }

    // If shlex fails to parse (unbalanced quotes), fall back to simple whitespace split
    shlex::split(additional_args).unwrap_or_else(|| {
        additional_args
            .split_whitespace()
            .map(str::to_string)
            .collect()
    })
}

/// Render a command line the way a shell would need it typed
pub fn format_ffmpeg_cmd(program: &Path, args: &[OsString]) -> String {
    let parts: Vec<String> = std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| part.to_string_lossy().into_owned())
        .collect();

    shlex::try_join(parts.iter().map(String::as_str)).unwrap_or_else(|_| parts.join(" "))
}

/// Outcome of an ffmpeg process that ran to exit
#[derive(Debug, Clone)]
pub struct FfmpegOutput {
    pub exit_code: i32,
    pub stderr: String,
}

/// Read a diagnostic stream to its end, keeping whatever arrived before a read error
fn read_diagnostics<R: Read>(mut pipe: R, worker_id: usize) -> String {
    let mut bytes = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut bytes) {
        tracing::debug!(
            worker_id,
            read = bytes.len(),
            "ffmpeg stderr ended early: {}",
            e
        );
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Run ffmpeg to completion, collecting everything it writes to stderr
///
/// The wait can be cut short by `cancel` or by `timeout`; either kills the process.
pub fn run_ffmpeg<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    worker_id: usize,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Result<FfmpegOutput, JobError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| JobError::Spawn { worker_id, source })?;

    let stderr = child.stderr.take();
    let started = Instant::now();

    thread::scope(|scope| {
        // The reader owns the pipe and closes it when the stream ends
        let reader = scope.spawn(move || {
            stderr
                .map(|pipe| read_diagnostics(pipe, worker_id))
                .unwrap_or_default()
        });

        let outcome = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status.code().unwrap_or(NO_EXIT_CODE)),
                Ok(None) => {}
                Err(e) => break Err(JobError::io("failed to wait for", program, e)),
            }

            if cancel.is_cancelled() {
                break Err(JobError::Cancelled);
            }
            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    break Err(JobError::TimedOut { after: limit });
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        if outcome.is_err() {
            let _ = child.kill();
            let _ = child.wait();
        }

        let stderr = reader.join().unwrap_or_default();
        outcome.map(|exit_code| FfmpegOutput { exit_code, stderr })
    })
}
