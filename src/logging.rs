//! Tracing setup.
//!
//! `start` logs JSON lines to a daily-rotated file under the runtime `logs/`
//! directory and a compact human format to stderr. One-shot subcommands only
//! log to stderr so their stdout stays clean. Both honour `RUST_LOG`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Daily log files kept on disk.
const RETAINED_LOG_FILES: usize = 14;

/// Keeps the background log writer alive; drop it last to flush.
pub struct LoggingGuard {
    _writer: WorkerGuard,
}

/// Install file + stderr logging for the long-running bot.
///
/// Files are named `fasilbot.YYYY-MM-DD.log`; only the newest
/// [`RETAINED_LOG_FILES`] are kept.
///
/// # Errors
///
/// Returns an error if the directory or appender cannot be created, or if a
/// global subscriber is already installed.
pub fn init_production(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", logs_dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("fasilbot")
        .filename_suffix("log")
        .max_log_files(RETAINED_LOG_FILES)
        .build(logs_dir)
        .map_err(|e| anyhow::anyhow!("cannot open log file in {}: {e}", logs_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("logging already initialised: {e}"))?;

    Ok(LoggingGuard { _writer: guard })
}

/// Install stderr-only logging for `console`, `prompt` and `check`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_cli() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("logging already initialised: {e}"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
