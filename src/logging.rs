//! Logging setup for SQLFlow.
//!
//! The interactive chat writes logs to a file so the transcript on the
//! terminal stays readable; `--log-stderr` sends them to stderr instead.

use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "sqlflow.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to the log file returned by [`get_log_path`].
///
/// Returns the path written to, or `None` if the file could not be created;
/// in that case logging stays disabled.
pub fn init_file_logging() -> Option<PathBuf> {
    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            return None;
        }
    }

    // Truncated on each run
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            return None;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    Some(log_path)
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the path for the log file.
///
/// `$XDG_STATE_HOME/sqlflow/sqlflow.log` on Linux, the config directory on
/// platforms without a state directory, the temp directory as a last resort.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("sqlflow").join(LOG_FILE_NAME);
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("sqlflow").join(LOG_FILE_NAME);
    }

    std::env::temp_dir().join(LOG_FILE_NAME)
}
