//! Tracing subscriber setup.
//!
//! Console output plus, optionally, two dated files in the log directory:
//! `pipeline_YYYYMMDD.log` receives everything at the configured level and
//! `errors_YYYYMMDD.log` receives only ERROR events on [`ERROR_TARGET`].

use crate::config::LoggingConfig;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::filter::{EnvFilter, LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Target of the error channel. Events logged with this target at ERROR level
/// land in the dedicated error log as well as the normal outputs.
pub const ERROR_TARGET: &str = "barstore::errors";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize tracing subscriber: {0}")]
    Subscriber(String),
}

/// Install the global subscriber. Call once from the binary's `main`.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let console_filter = env_filter(&config.level);
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(console_filter);

    if !config.file {
        return tracing_subscriber::registry()
            .with(console)
            .try_init()
            .map_err(|e| LoggingError::Subscriber(e.to_string()));
    }

    let stamp = chrono::Local::now().format("%Y%m%d").to_string();
    let pipeline_file = open_log(&config.dir, &format!("pipeline_{stamp}.log"))?;
    let errors_file = open_log(&config.dir, &format!("errors_{stamp}.log"))?;

    let progress = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(pipeline_file))
        .with_filter(env_filter(&config.level));

    let errors = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(errors_file))
        .with_filter(Targets::new().with_target(ERROR_TARGET, LevelFilter::ERROR));

    tracing_subscriber::registry()
        .with(console)
        .with(progress)
        .with(errors)
        .try_init()
        .map_err(|e| LoggingError::Subscriber(e.to_string()))
}

/// `RUST_LOG` wins; otherwise the configured level applies to every target.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn open_log(dir: &Path, name: &str) -> Result<File, LoggingError> {
    let path = dir.join(name);
    fs::create_dir_all(dir).map_err(|source| LoggingError::OpenFile {
        path: path.clone(),
        source,
    })?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::OpenFile { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_log_creates_directory_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/logs");
        open_log(&dir, "errors_20240101.log").unwrap();
        assert!(dir.join("errors_20240101.log").is_file());
    }

    #[test]
    fn open_log_appends_to_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("pipeline.log"), "first\n").unwrap();

        let mut file = open_log(tmp.path(), "pipeline.log").unwrap();
        std::io::Write::write_all(&mut file, b"second\n").unwrap();

        let content = fs::read_to_string(tmp.path().join("pipeline.log")).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
