use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::format::{AudioFormat, extension_of, is_audio_file, is_lossy_extension};
use super::types::{Job, JobOptions, LossyPolicy};
use crate::engine::error::MirrorError;

/// Check if a directory path contains any blacklisted substring
pub fn is_blacklisted(dir: &Path, blacklist: &[String]) -> bool {
    let dir = dir.to_string_lossy();
    blacklist
        .iter()
        .filter(|entry| !entry.is_empty())
        .any(|entry| dir.contains(entry.as_str()))
}

/// Mirror a source directory into the destination tree
pub fn mirror_dir(dir: &Path, source_root: &Path, dest_root: &Path) -> PathBuf {
    match dir.strip_prefix(source_root) {
        Ok(relative) => dest_root.join(relative),
        Err(_) => dest_root.to_path_buf(),
    }
}

/// `<dir>/<stem>.<extension>`
fn with_target_extension(dir: &Path, source: &Path, extension: &str) -> PathBuf {
    let mut name: OsString = source.file_stem().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    dir.join(name)
}

/// Walk `source_root` and plan a job for every audio file not yet mirrored,
/// copying lossy sources untouched
pub fn plan_jobs(
    source_root: &Path,
    dest_root: &Path,
    format: &AudioFormat,
    options: &JobOptions,
    blacklist: &[String],
) -> Result<Vec<Job>, MirrorError> {
    plan_jobs_with_policy(
        source_root,
        dest_root,
        format,
        options,
        blacklist,
        LossyPolicy::Copy,
    )
}

/// Walk `source_root` and plan jobs, handling lossy sources per `policy`
///
/// Any traversal error aborts planning; a partial plan is never returned.
/// Every planned job writes a distinct destination. When two sources map to the
/// same output (`01.flac` and `01.mp3` with an mp3 target), the first in walk
/// order keeps it and the other is skipped.
pub fn plan_jobs_with_policy(
    source_root: &Path,
    dest_root: &Path,
    format: &AudioFormat,
    options: &JobOptions,
    blacklist: &[String],
    policy: LossyPolicy,
) -> Result<Vec<Job>, MirrorError> {
    if !source_root.is_dir() {
        return Err(MirrorError::InvalidRoot(source_root.to_path_buf()));
    }

    let mut jobs = Vec::new();
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    // Symlinks are not followed so a link back up the tree cannot loop the walk
    for entry in WalkDir::new(source_root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| MirrorError::Walk {
            path: e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source_root.to_path_buf()),
            source: e,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(parent) = path.parent() else {
            continue;
        };
        if is_blacklisted(parent, blacklist) || !is_audio_file(path) {
            continue;
        }

        let out_dir = mirror_dir(parent, source_root, dest_root);
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let same_name = out_dir.join(file_name);
        let target = with_target_extension(&out_dir, path, format.extension);

        // Already mirrored by an earlier run
        if same_name.exists() || target.exists() {
            continue;
        }

        let lossy = extension_of(path).is_some_and(|ext| is_lossy_extension(&ext));
        let (encode, destination) = match (lossy, policy) {
            (true, LossyPolicy::Copy) => (false, same_name),
            (true, LossyPolicy::Ignore) => continue,
            _ => (true, target),
        };

        if !claimed.insert(destination.clone()) {
            tracing::warn!(
                source = %path.display(),
                output = %destination.display(),
                "another source already writes this output, skipping"
            );
            continue;
        }

        let job = if encode {
            Job::transcode(path.to_path_buf(), destination, *format, options.clone())
        } else {
            Job::copy(path.to_path_buf(), destination, *format, options.clone())
        };
        jobs.push(job);
    }

    tracing::info!(
        source = %source_root.display(),
        jobs = jobs.len(),
        "planned jobs"
    );

    Ok(jobs)
}
