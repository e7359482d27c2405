#![allow(dead_code)]

use audiomirror::engine::{AudioFormat, Job, JobOptions, lookup_format};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Create every `relative` file under `root` with a few placeholder bytes
pub fn library(root: &Path, files: &[&str]) {
    for relative in files {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("audio:{}", relative)).unwrap();
    }
}

/// Relative paths of every file under `root`, sorted
pub fn tree(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

pub fn opus() -> (AudioFormat, JobOptions) {
    let format = lookup_format("opus").unwrap();
    let options = JobOptions::resolve(&format, 0, "libopus".to_string());
    (format, options)
}

/// A transcode job between two paths under `dir`
pub fn transcode_job(dir: &Path, name: &str) -> Job {
    let (format, options) = opus();
    Job::transcode(
        dir.join("in").join(format!("{}.flac", name)),
        dir.join("out").join(format!("{}.opus", name)),
        format,
        options,
    )
}

/// A copy job whose source exists
pub fn copy_job(dir: &Path, name: &str) -> Job {
    let (format, options) = opus();
    let source = dir.join("in").join(format!("{}.mp3", name));
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, b"mp3 bytes").unwrap();
    Job::copy(
        source,
        dir.join("out").join(format!("{}.mp3", name)),
        format,
        options,
    )
}

/// Shell script standing in for ffmpeg
///
/// - `-loglevel error -encoders` prints an encoder table with libopus, aac and libmp3lame
/// - outputs whose path contains `fail` exit 1 with two lines on stderr
/// - outputs whose path contains `slow` take 100ms
/// - everything else writes `encoded` to the last argument
#[cfg(unix)]
pub const FAKE_FFMPEG: &str = r#"#!/bin/sh
if [ "$3" = "-encoders" ]; then
cat <<'TABLE'
Encoders:
 V..... = Video
 A..... = Audio
 S..... = Subtitle
 .F.... = Frame-level multithreading
 ..S... = Slice-level multithreading
 ...X.. = Codec is experimental
 ....B. = Supports draw_horiz_band
 .....D = Supports direct rendering method 1
 ------
 A....D aac                  AAC (Advanced Audio Coding)
 A....D libmp3lame           libmp3lame MP3 (MPEG audio layer 3) (codec mp3)
 A....D libopus              libopus Opus (codec opus)
TABLE
exit 0
fi
for last; do :; done
case "$last" in
  *fail*)
    echo "Invalid data found when processing input" >&2
    echo "Conversion failed!" >&2
    exit 1
    ;;
  *slow*)
    sleep 0.1
    ;;
esac
printf 'encoded' > "$last"
"#;

#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    fs::write(&path, FAKE_FFMPEG).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
