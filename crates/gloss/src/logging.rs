//! Structured logging to a file
//!
//! The TUI owns the terminal, so events go to a log file. Logging is off
//! unless `GLOSS_LOG` holds an env-filter directive (e.g. `gloss_core=debug`).

use crate::config::default_log_path;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "GLOSS_LOG";

fn log_path(cli: Option<&Path>) -> Option<PathBuf> {
    cli.map(Path::to_path_buf).or_else(default_log_path)
}

/// Install the global subscriber. Returns the log file path when enabled.
pub fn init(log_file: Option<&Path>) -> Result<Option<PathBuf>> {
    let Ok(directives) = std::env::var(LOG_ENV) else {
        return Ok(None);
    };
    if directives.trim().is_empty() {
        return Ok(None);
    }

    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid {} filter: {}", LOG_ENV, directives))?;
    let path = log_path(log_file).context("No location for the log file")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("Failed to install logger")?;

    tracing::info!(path = %path.display(), "logging started");
    Ok(Some(path))
}
