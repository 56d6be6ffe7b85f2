use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    prelude::*,
    EnvFilter,
};

use crate::constants::LOG_FILE_NAME;

/// Installs the global subscriber writing to `<log_dir>/daemon.log`. `RUST_LOG` wins over
/// `default_level` when set.
pub fn setup_logging(log_dir: &str, default_level: &str) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, LOG_FILE_NAME);

    let file_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_timer(SystemTime)
        .with_writer(file_appender);

    let subscriber = tracing_subscriber::registry().with(filter).with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    tracing::info!(
        "Logging system initialized. Writing to {:?}",
        Path::new(log_dir).join(LOG_FILE_NAME)
    );

    Ok(())
}

/// Console logging for foreground commands.
pub fn setup_console_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
