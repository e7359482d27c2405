// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{BatchConfig, LossyPolicy, split_extra_args};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Target format name from the catalog
    #[serde(default = "default_format")]
    pub format: String,

    /// Directory-name substrings to leave out of the mirror
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Concurrent workers (0 = one per CPU)
    #[serde(default)]
    pub workers: usize,

    /// Bitrate in kbps (0 = the format's preferred bitrate)
    #[serde(default)]
    pub bitrate: u32,

    /// What to do with sources that are already lossy
    #[serde(default)]
    pub lossy_policy: LossyPolicy,

    /// ffmpeg binary to run
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Extra ffmpeg arguments for every transcode, shell-quoted
    #[serde(default)]
    pub extra_args: String,

    /// Kill a single transcode after this many seconds (0 = never)
    #[serde(default)]
    pub job_timeout_secs: u64,
}

fn default_format() -> String {
    "opus".to_string()
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            blacklist: Vec::new(),
            workers: 0,
            bitrate: 0,
            lossy_policy: LossyPolicy::Copy,
            ffmpeg: default_ffmpeg(),
            extra_args: String::new(),
            job_timeout_secs: 0,
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join("audiomirror")
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("audiomirror")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the default location, falling back to built-in defaults
    /// when no file exists
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Check if config file exists
    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Build a batch config from these defaults for the given trees
    pub fn batch_config(&self, source_root: PathBuf, dest_root: PathBuf) -> BatchConfig {
        let defaults = &self.defaults;
        let mut batch = BatchConfig::new(source_root, dest_root, defaults.format.clone());
        batch.blacklist = defaults.blacklist.clone();
        batch.workers = (defaults.workers > 0).then_some(defaults.workers);
        batch.bitrate = defaults.bitrate;
        batch.lossy_policy = defaults.lossy_policy;
        batch.ffmpeg = defaults.ffmpeg.clone();
        batch.extra_args = split_extra_args(&defaults.extra_args);
        batch.job_timeout =
            (defaults.job_timeout_secs > 0).then(|| Duration::from_secs(defaults.job_timeout_secs));
        batch
    }
}
