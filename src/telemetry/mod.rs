//! Tracing subscriber setup: readable stderr output plus a JSON log file per run.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::AppError;

const DEFAULT_FILTER: &str = "csv_report_import=info";

/// Per-run log file name, e.g. `import_20240501T102030.log`.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%dT%H%M%S");
    log_dir.join(format!("import_{stamp}.log"))
}

/// Install the global subscriber and return the log file it appends to.
pub fn init(log_dir: &Path) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_file_path(log_dir);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| AppError::Internal(format!("Failed to install tracing subscriber: {e}")))?;

    Ok(path)
}
