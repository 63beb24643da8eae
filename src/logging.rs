//! Logging setup.
//!
//! The TUI owns the terminal, so logs always go to `habitust.log` next to the
//! habits file instead of stdout/stderr.

use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::error::Result;

/// Keeps the background log writer alive. Pending lines are flushed on drop.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Initialize file logging with the filter from `config.log_level`.
pub fn init(config: &Config) -> Result<LoggingGuard> {
    let dir = match config.log_path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;
    let file_name = config
        .log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "habitust.log".into());

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    // a second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init();

    tracing::info!(
        log_file = %config.log_path.display(),
        level = %config.log_level,
        "logging initialized"
    );
    Ok(LoggingGuard { _guard: guard })
}

/// Initialize logging for tests (captured by the test harness).
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
