//! Runtime configuration
//!
//! Configuration is written in RON, or in JSON for files with a `.json`
//! extension. Every field has a default, so an empty document `()` (or
//! `{}`) is a valid configuration.
//!
//! # Usage
//!
//! ```rust
//! use searchspaces::util::config::Config;
//!
//! let config = Config::from_ron_str("(eval: (max_depth: 256))").unwrap();
//! assert_eq!(config.eval.max_depth, 256);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::util::logger::LogLevel;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Evaluator settings
    #[serde(default)]
    pub eval: EvalConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Evaluator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Deepest chain of nested node evaluations before giving up
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Default evaluation depth limit
pub const DEFAULT_MAX_DEPTH: usize = 1_000;

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
}

impl Config {
    /// Parse a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_ron_str(&content),
        }
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config serialize error: {0}")]
    Serialize(#[from] ron::Error),
}
