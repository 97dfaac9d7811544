//! Engine configuration
//!
//! A small JSON file; every field is optional:
//!
//! ```json
//! {
//!   "source_dir": "data/sdtm",
//!   "output_dir": "data/adam",
//!   "log_filter": "adamderive=debug"
//! }
//! ```
//!
//! Relative directories are resolved against the config file's directory.
//! Unknown fields are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::observability::Event;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Invalid config JSON in '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Invalid config field '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "ADAM_CONFIG_READ",
            ConfigError::Parse { .. } => "ADAM_CONFIG_PARSE",
            ConfigError::Invalid { .. } => "ADAM_CONFIG_INVALID",
        }
    }
}

/// Settings shared by CLI commands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory of source tables; overrides the spec's `sdtm_dir`
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Directory for built tables; overrides the spec's `adam_dir`
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// `tracing` filter directives used when `ADAM_LOG` is unset
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl EngineConfig {
    /// Loads and validates a config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut config: EngineConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        config.validate()?;

        if let Some(base) = path.parent() {
            config.source_dir = config.source_dir.map(|d| resolve_against(base, d));
            config.output_dir = config.output_dir.map(|d| resolve_against(base, d));
        }

        info!(
            event = Event::ConfigLoaded.as_str(),
            path = %path.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Checks field values
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, dir) in [("source_dir", &self.source_dir), ("output_dir", &self.output_dir)] {
            if dir.as_ref().is_some_and(|d| d.as_os_str().is_empty()) {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must not be empty".to_string(),
                });
            }
        }

        if let Some(filter) = &self.log_filter {
            EnvFilter::try_new(filter).map_err(|e| ConfigError::Invalid {
                field: "log_filter",
                message: e.to_string(),
            })?;
        }

        Ok(())
    }
}

fn resolve_against(base: &Path, dir: PathBuf) -> PathBuf {
    if dir.is_relative() {
        base.join(dir)
    } else {
        dir
    }
}
