//! Logger setup
//!
//! The library itself only emits `tracing` events: `debug!` when an
//! evaluation or a topological sort starts, `trace!` for every evaluated
//! node and every lazy lookup. Applications and tests install a subscriber
//! with [`init`] or one of its variants to see them.
//!
//! Output is one line per event, `[LEVEL] message`. At `Trace` the event
//! target is shown as well, so per-node events can be told apart.
//!
//! # Usage
//!
//! ```rust
//! use searchspaces::util::logger::{self, LogLevel};
//!
//! logger::init_with_level("debug".parse::<LogLevel>().unwrap());
//! tracing::debug!("evaluating {} roots", 2);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

use crate::util::config::LogConfig;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    /// Case-insensitive level name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Install the `[LEVEL] message` subscriber at INFO.
pub fn init() {
    init_with_level(LogLevel::Info);
}

/// Install the `[LEVEL] message` subscriber at `level`.
///
/// Does nothing if a global subscriber is already installed, so tests may
/// call it repeatedly.
pub fn init_with_level(level: LogLevel) {
    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(level == LogLevel::Trace)
        .with_ansi(false)
        .compact()
        .with_filter(LevelFilter::from_level(level.into()));

    let _ = Registry::default().with(layer).try_init();
}

/// Install the subscriber described by a [`LogConfig`].
pub fn init_from_config(config: &LogConfig) {
    init_with_level(config.level);
}

/// Install the subscriber at DEBUG.
pub fn init_debug() {
    init_with_level(LogLevel::Debug);
}
