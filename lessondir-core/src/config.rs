//! Global lessondir configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{LessonDirError, LessonDirResult};

static DEFAULT_DATA_DIR: &str = "~/.local/share/lessondir";
static DEFAULT_PROVIDER: &str = "firestore";
static DEFAULT_POLL_INTERVAL: &str = "5s";
const DEFAULT_DURATION_MINUTES: u32 = 30;

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_poll_interval() -> String {
    DEFAULT_POLL_INTERVAL.to_string()
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

/// Configuration at ~/.config/lessondir/config.toml
///
/// Every key can be overridden by a `LESSONDIR_<KEY>` environment variable.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LessonDirConfig {
    /// Where signed-out data lives (one JSON file per collection)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Remote provider used while signed in (`lessondir-provider-<name>`)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// How often the provider is polled for a fresh snapshot
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Lesson length used when none is given
    #[serde(default = "default_duration")]
    pub default_duration: u32,
}

impl Default for LessonDirConfig {
    fn default() -> Self {
        LessonDirConfig {
            data_dir: default_data_dir(),
            provider: default_provider(),
            poll_interval: default_poll_interval(),
            default_duration: default_duration(),
        }
    }
}

impl LessonDirConfig {
    pub fn config_dir() -> LessonDirResult<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| LessonDirError::Config("Could not determine config directory".into()))?
            .join("lessondir");
        Ok(dir)
    }

    pub fn config_path() -> LessonDirResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load ~/.config/lessondir/config.toml, creating a commented-out default
    /// the first time.
    pub fn load() -> LessonDirResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> LessonDirResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("LESSONDIR"))
            .build()
            .map_err(|e| LessonDirError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| LessonDirError::Config(e.to_string()))
    }

    /// `data_dir` with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();
        PathBuf::from(full_path_str)
    }

    pub fn poll_interval(&self) -> LessonDirResult<Duration> {
        humantime::parse_duration(&self.poll_interval).map_err(|e| {
            LessonDirError::Config(format!("Invalid poll_interval '{}': {e}", self.poll_interval))
        })
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> LessonDirResult<()> {
        let contents = format!(
            "\
# lessondir configuration

# Where lessons are kept while signed out:
# data_dir = \"{DEFAULT_DATA_DIR}\"

# Remote provider used while signed in:
# provider = \"{DEFAULT_PROVIDER}\"

# How often the remote is checked for changes:
# poll_interval = \"{DEFAULT_POLL_INTERVAL}\"

# Lesson length in minutes when none is given:
# default_duration = {DEFAULT_DURATION_MINUTES}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LessonDirError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| LessonDirError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
