//! Tracing subscriber setup.
//!
//! The TUI owns the terminal, so everything goes to a daily-rolling file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

const LOG_FILE_PREFIX: &str = "encore.log";

/// `RUST_LOG` when set, else the configured directives.
pub fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Resolve the log directory, falling back to `./logs`.
pub fn log_dir(settings: &Settings) -> PathBuf {
    settings.log_dir().unwrap_or_else(|| PathBuf::from("logs"))
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// or buffered lines are lost.
pub fn init(settings: &Settings) -> Result<WorkerGuard> {
    let dir = log_dir(settings);
    init_in(&dir, &settings.logging.filter)
}

pub fn init_in(dir: &Path, filter: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(env_filter(filter))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("a global tracing subscriber is already installed")?;

    Ok(guard)
}
