//! Pipeline configuration.
//!
//! A single `PipelineConfig` is loaded once (TOML file and/or defaults, then
//! environment overrides) and handed to each component's constructor. Nothing
//! reads configuration from ambient global state.

use crate::data::frame::CANONICAL_COLUMNS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Longest accepted lookback: one hundred years.
pub const MAX_LOOKBACK_DAYS: i64 = 36_525;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config value {field} = {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Complete configuration for one pipeline deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub fetch: FetchConfig,
    pub ingest: IngestConfig,
    pub validation: ValidationConfig,
}

/// Where the columnar store lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/stock_prices"),
        }
    }
}

/// Log verbosity and destinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "debug").
    pub level: String,
    /// Directory for the dated progress and error log files.
    pub dir: PathBuf,
    /// Write log files in addition to the console.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            dir: PathBuf::from("logs"),
            file: true,
        }
    }
}

/// Provider access policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total attempts per fetch (first call included).
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay_ms: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Minimum spacing between any two provider calls.
    pub min_request_interval_ms: u64,
    /// How long the circuit breaker refuses requests once tripped.
    pub circuit_breaker_cooldown_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2_000,
            request_timeout_secs: 30,
            min_request_interval_ms: 500,
            circuit_breaker_cooldown_secs: 30 * 60,
        }
    }
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn circuit_breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_cooldown_secs)
    }
}

/// Window selection defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Days of history fetched for a ticker with no stored data.
    pub lookback_days: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            lookback_days: 365 * 5,
        }
    }
}

/// Validator thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_data_points: usize,
    pub max_gap_days: i64,
    pub required_columns: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_data_points: 10,
            max_gap_days: 7,
            required_columns: CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration file. Missing sections and fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and check a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lookback = self.ingest.lookback_days;
        if lookback < 1 {
            return Err(ConfigError::Invalid {
                field: "ingest.lookback_days",
                value: lookback.to_string(),
                reason: "must be at least 1",
            });
        }
        if lookback > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::Invalid {
                field: "ingest.lookback_days",
                value: lookback.to_string(),
                reason: "must not exceed 36525 (100 years)",
            });
        }
        if self.fetch.max_retries < 1 {
            return Err(ConfigError::Invalid {
                field: "fetch.max_retries",
                value: self.fetch.max_retries.to_string(),
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply environment overrides: `LOG_LEVEL`, `BARSTORE_DB_DIR`, `BARSTORE_LOG_DIR`.
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.logging.level = level.trim().to_ascii_lowercase();
        }
        if let Some(dir) = lookup("BARSTORE_DB_DIR").filter(|v| !v.is_empty()) {
            self.store.root = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("BARSTORE_LOG_DIR").filter(|v| !v.is_empty()) {
            self.logging.dir = PathBuf::from(dir);
        }
    }

    /// Create the store root and (when file logging is on) the log directory.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        let mut dirs = vec![self.store.root.as_path()];
        if self.logging.file {
            dirs.push(self.logging.dir.as_path());
        }
        for dir in dirs {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}
