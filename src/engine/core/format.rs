use serde::Serialize;
use std::path::Path;

use crate::engine::error::MirrorError;

/// A target audio format ffmpeg can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioFormat {
    pub name: &'static str,
    pub is_lossy: bool,
    /// Encoders in quality order, index 0 preferred. Empty for lossless formats.
    pub encoders: &'static [&'static str],
    /// Bitrate in kbps roughly matching a 320k MP3 (0 = ffmpeg default)
    pub preferred_bitrate: u32,
    /// File extension without the leading dot
    pub extension: &'static str,
    /// Extra ffmpeg arguments the container needs
    pub ffmpeg_args: &'static [&'static str],
}

impl AudioFormat {
    /// Lossless formats use ffmpeg's default encoder for the container
    pub fn needs_encoder(&self) -> bool {
        !self.encoders.is_empty()
    }
}

pub const AUDIO_FORMATS: &[AudioFormat] = &[
    AudioFormat {
        name: "mp3",
        is_lossy: true,
        encoders: &["libmp3lame", "libshine"],
        preferred_bitrate: 320,
        extension: "mp3",
        ffmpeg_args: &[],
    },
    // m4a carries cover art as a video stream; copy it instead of re-encoding
    AudioFormat {
        name: "aac",
        is_lossy: true,
        encoders: &["libfdk_aac", "aac"],
        preferred_bitrate: 256,
        extension: "m4a",
        ffmpeg_args: &["-c:v", "copy"],
    },
    AudioFormat {
        name: "vorbis",
        is_lossy: true,
        encoders: &["libvorbis", "vorbis"],
        preferred_bitrate: 192,
        extension: "ogg",
        ffmpeg_args: &[],
    },
    AudioFormat {
        name: "opus",
        is_lossy: true,
        encoders: &["libopus"],
        preferred_bitrate: 128,
        extension: "opus",
        ffmpeg_args: &[],
    },
    AudioFormat {
        name: "flac",
        is_lossy: false,
        encoders: &[],
        preferred_bitrate: 0,
        extension: "flac",
        ffmpeg_args: &[],
    },
    AudioFormat {
        name: "alac",
        is_lossy: false,
        encoders: &[],
        preferred_bitrate: 0,
        extension: "m4a",
        ffmpeg_args: &[],
    },
    AudioFormat {
        name: "aiff",
        is_lossy: false,
        encoders: &[],
        preferred_bitrate: 0,
        extension: "aiff",
        ffmpeg_args: &[],
    },
    AudioFormat {
        name: "wav",
        is_lossy: false,
        encoders: &[],
        preferred_bitrate: 0,
        extension: "wav",
        ffmpeg_args: &[],
    },
];

/// Audio file extensions picked up while scanning
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "ogg", "opus", "mp2", "aac", "flac", "wav", "alac", "aiff", "ape", "webm",
    "mp4", "wma",
];

/// Look up a catalog format by name
pub fn lookup_format(name: &str) -> Result<AudioFormat, MirrorError> {
    AUDIO_FORMATS
        .iter()
        .find(|format| format.name == name)
        .copied()
        .ok_or_else(|| MirrorError::FormatNotFound(name.to_string()))
}

/// Lowercased extension of a path, if it is valid UTF-8
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a path has an audio file extension
pub fn is_audio_file(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// An extension is lossy if any lossy catalog format writes it
pub fn is_lossy_extension(extension: &str) -> bool {
    AUDIO_FORMATS
        .iter()
        .any(|format| format.is_lossy && format.extension.eq_ignore_ascii_case(extension))
}
