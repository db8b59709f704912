//! Tracing subscriber setup.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Log file written into the output directory while watching.
pub const WATCH_LOG_FILE: &str = "centaur_watcher.log";

fn env_filter(verbose: bool, default: &str) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    }
}

/// Console-only logging for one-shot commands.
pub fn init_console(verbose: bool, default: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, default))
        .with_writer(std::io::stderr)
        .init();
}

/// Console logging plus an appending log file in `dir`. The guard must be
/// held until exit so buffered lines are flushed.
pub fn init_with_file(verbose: bool, dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, WATCH_LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = Registry::default()
        .with(env_filter(verbose, "info"))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer));
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    tracing::info!(log = %dir.join(WATCH_LOG_FILE).display(), "Logging initialized");
    Ok(guard)
}
