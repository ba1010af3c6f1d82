//! File logging. The terminal belongs to the UI, so everything goes to a
//! daily rolling file under the data directory.

use std::path::{Path, PathBuf};

use color_eyre::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "miq.log";
const DEFAULT_FILTER: &str = "miq=info,miq_db=info,miq_auth=info";

#[must_use]
pub fn log_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "miq").map_or_else(
        || std::env::temp_dir().join("miq").join("logs"),
        |dirs| dirs.data_dir().join("logs"),
    )
}

/// `MIQ_LOG` wins over `RUST_LOG`; both fall back to [`DEFAULT_FILTER`].
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("MIQ_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Keep the guard alive for the whole run or
/// buffered lines are lost.
///
/// # Errors
///
/// Fails when the log directory cannot be created.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init();

    tracing::info!(dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}
