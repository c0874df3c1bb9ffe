//! Logging for the boardclock binaries
//!
//! Each binary logs to its own daily-rotated file in the XDG state directory
//! (`boardclock-sync.log`, `boardclock-report.log`, ...), so a long-running
//! `boardclock-sync --watch` does not interleave with one-shot reports.
//! Warnings and errors are echoed to stderr as well: skipped tasks and
//! failed boards are worth seeing without opening the log.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the file writer alive; pending lines are flushed on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    path: PathBuf,
}

impl LoggingGuard {
    /// Current log file (without the rotation date suffix)
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Install the subscriber for binary `app`.
///
/// `RUST_LOG` overrides `logging.level` for the file.
pub fn init(config: &LoggingConfig, app: &str) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(format!("{}.log", app))
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("failed to create log file: {}", e)))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_filter(file_filter(&config.level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!(app, level = %config.level, "Logging initialized");

    Ok(LoggingGuard {
        _guard: guard,
        path: Config::log_path(app),
    })
}

/// Subscriber for integration tests; output is captured per test and
/// shown only on failure. Safe to call more than once.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn file_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}
