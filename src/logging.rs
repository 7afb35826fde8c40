use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to a file. The terminal belongs to the UI while it runs, so the
/// TUI must never write log lines to stdout or stderr. Keep the guard alive
/// until exit so buffered lines are flushed.
pub fn init_file(log_file_path: &Path) -> Result<WorkerGuard> {
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("opening log file {}", log_file_path.display()))?;
    let (writer, guard) = non_blocking(log_file);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .with(env_filter())
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}

/// Log to stderr, for the one-shot subcommands
pub fn init_stderr() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter())
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}
