// Logging setup.
// The terminal belongs to the viewer, so logs go to a daily-rotated file.

use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LoggingConfig, log_dir};
use crate::error::{BlameError, Result};

/// Keeps the non-blocking writer alive; pending lines are flushed on drop.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Initialize tracing. RUST_LOG takes precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let dir = log_dir().ok_or_else(|| BlameError::Other("no home directory".to_string()))?;
    fs::create_dir_all(&dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &dir, "remote-blame.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!(log_dir = %dir.display(), level = %config.level, "Logging initialized");

    Ok(LoggingGuard { _guard: guard })
}

/// Route logs to the test harness output.
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
