//! Container configuration.
//!
//! The only knob is the log level gating the container's own diagnostics. It
//! can come from code, from the `FERROUS_LOCATOR_LOG_LEVEL` environment
//! variable or, with the `config` feature, from JSON.

use std::env;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Environment variable read by [`ContainerConfig::from_env`].
pub const LOG_LEVEL_ENV: &str = "FERROUS_LOCATOR_LOG_LEVEL";

/// Verbosity of the container's own diagnostics.
///
/// Levels are ordered `Debug < Info < Error < None`. Events are emitted
/// through `tracing`; this level only decides which ones the container
/// bothers to produce (timings are not even measured above `Info`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Error,
    None,
}

impl LogLevel {
    /// True when a message at `level` should be produced.
    pub fn is_at(self, level: LogLevel) -> bool {
        self != LogLevel::None && self <= level
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Error => "error",
            LogLevel::None => "none",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing an unknown log level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level '{0}' (expected debug, info, error or none)")]
pub struct ParseLogLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "error" => Ok(LogLevel::Error),
            "none" | "off" => Ok(LogLevel::None),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

/// Settings a container is built with.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{ContainerConfig, LogLevel};
///
/// let config = ContainerConfig::default().with_log_level(LogLevel::Info);
/// assert!(config.log_level.is_at(LogLevel::Error));
/// assert!(!config.log_level.is_at(LogLevel::Debug));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    pub log_level: LogLevel,
}

impl ContainerConfig {
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Defaults, overridden by `FERROUS_LOCATOR_LOG_LEVEL` when it holds a
    /// valid level.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var(LOG_LEVEL_ENV) {
            match raw.parse() {
                Ok(level) => config.log_level = level,
                Err(err) => tracing::warn!("ignoring {}: {}", LOG_LEVEL_ENV, err),
            }
        }
        config
    }

    /// Parses a JSON document such as `{"log_level": "debug"}`.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
