use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::Deserialize;

use crate::error_handling::types::ConfigError;
use crate::storage::log_scanner::TimeWindow;

pub const DEFAULT_LOG_DIR: &str = "cst-logs";
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 1000;

/// Optional TOML configuration file.
///
/// Every key may be omitted; values given on the command line or through the
/// environment take precedence.
///
/// ```toml
/// log_dir = "/var/log/cst"
/// log_level = "debug"
/// connect_timeout_ms = 3000
/// drain_timeout_ms = 500
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub drain_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}

/// Everything a capture run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Device address, `host[:port]`.
    pub address: String,
    pub log_dir: PathBuf,
    /// `None` captures until interrupted or disconnected.
    pub duration: Option<Duration>,
    pub connect_timeout: Duration,
    pub drain_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    pub log_dir: PathBuf,
    /// Type tag matched against the top-level payload keys.
    pub message_type: String,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Capture(CaptureSettings),
    Query(QuerySettings),
}

/// Problem found while resolving the configuration that does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A time bound that is not RFC 3339; the bound is left open.
    InvalidInstant { text: String, reason: String },
    /// The window starts after it ends, so nothing can match.
    EmptyWindow,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::InvalidInstant { text, reason } => {
                write!(f, "Ignoring invalid instant '{}': {}", text, reason)
            }
            ConfigWarning::EmptyWindow => {
                write!(f, "Start of the time window is after its end, nothing will match")
            }
        }
    }
}
