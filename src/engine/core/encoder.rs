use std::collections::HashSet;

use super::format::AudioFormat;
use crate::engine::error::MirrorError;

/// Something that knows which encoders the installed ffmpeg supports
pub trait EncoderSource {
    fn encoders(&self) -> Result<HashSet<String>, MirrorError>;
}

/// A fixed capability set
impl EncoderSource for HashSet<String> {
    fn encoders(&self) -> Result<HashSet<String>, MirrorError> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderChoice {
    /// Empty when the format needs no explicit encoder
    pub encoder: String,
    /// True when the highest quality encoder in the preference list was available
    pub is_top_choice: bool,
}

impl EncoderChoice {
    /// Advice for the user when the preferred encoder for `format` was missing
    pub fn fallback_notice(&self, format: &AudioFormat) -> Option<String> {
        if self.is_top_choice {
            return None;
        }
        let preferred = format.encoders.first()?;
        Some(format!(
            "The preferred, highest quality {} encoder, {}, wasn't found. Please build ffmpeg with support for {} for the highest quality encoding.",
            format.name, preferred, preferred
        ))
    }
}

/// Pick the first encoder in `preferences` that is present in `available`
pub fn select_encoder(
    format_name: &str,
    preferences: &[&str],
    available: &HashSet<String>,
) -> Result<EncoderChoice, MirrorError> {
    if preferences.is_empty() {
        return Ok(EncoderChoice {
            encoder: String::new(),
            is_top_choice: true,
        });
    }

    preferences
        .iter()
        .position(|name| available.contains(*name))
        .map(|index| EncoderChoice {
            encoder: preferences[index].to_string(),
            is_top_choice: index == 0,
        })
        .ok_or_else(|| MirrorError::NoEncoderAvailable {
            format: format_name.to_string(),
            preferences: preferences.iter().map(|name| name.to_string()).collect(),
        })
}

/// Select an encoder for a catalog format, probing only when the format needs one
pub fn select_for_format(
    format: &AudioFormat,
    source: &dyn EncoderSource,
) -> Result<EncoderChoice, MirrorError> {
    if !format.needs_encoder() {
        return select_encoder(format.name, format.encoders, &HashSet::new());
    }

    let available = source.encoders()?;
    let choice = select_encoder(format.name, format.encoders, &available)?;

    if !choice.is_top_choice {
        tracing::debug!(
            format = format.name,
            preferred = format.encoders[0],
            using = %choice.encoder,
            "falling back to a lower ranked encoder"
        );
    }

    Ok(choice)
}
