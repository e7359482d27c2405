use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::encoder::EncoderSource;
use crate::engine::error::MirrorError;

/// Lines of legend ffmpeg prints before the encoder table
const ENCODER_LEGEND_LINES: usize = 10;

/// Check if ffmpeg is available and return its version
pub fn ffmpeg_version(program: &Path) -> Result<String> {
    let output = Command::new(program)
        .arg("-version")
        .output()
        .with_context(|| {
            format!(
                "Failed to execute {}. Is ffmpeg installed and in PATH?",
                program.display()
            )
        })?;

    if !output.status.success() {
        anyhow::bail!("ffmpeg command failed with status: {}", output.status);
    }

    let version_output = String::from_utf8_lossy(&output.stdout);
    let first_line = version_output.lines().next().unwrap_or("Unknown version");

    Ok(first_line.to_string())
}

/// Ask ffmpeg which encoders it was built with
pub fn probe_encoders(program: &Path) -> Result<HashSet<String>, MirrorError> {
    let output = Command::new(program)
        .args(["-loglevel", "error", "-encoders"])
        .output()
        .map_err(|e| MirrorError::Probe(format!("could not run {}: {}", program.display(), e)))?;

    if !output.status.success() {
        return Err(MirrorError::Probe(format!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(parse_encoder_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `ffmpeg -encoders` output into the set of encoder names
///
/// The legend block is skipped; every remaining line with at least two
/// fields contributes its second field.
pub fn parse_encoder_list(output: &str) -> HashSet<String> {
    output
        .lines()
        .skip(ENCODER_LEGEND_LINES)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// Encoder source backed by a real ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegEncoders {
    program: PathBuf,
}

impl FfmpegEncoders {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl EncoderSource for FfmpegEncoders {
    fn encoders(&self) -> Result<HashSet<String>, MirrorError> {
        probe_encoders(&self.program)
    }
}
