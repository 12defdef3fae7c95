use crate::error::PaperSeekError;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "paperseek.log";

/// Initialize logging
///
/// Console output always; when `log_dir` is given a non-ANSI copy is appended
/// to `log_dir/paperseek.log`. `RUST_LOG` takes precedence over `log_level`.
pub fn init_logging(log_dir: Option<&Path>, log_level: &str) -> Result<(), PaperSeekError> {
    let level = parse_log_level(log_level);
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()))
    };

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                PaperSeekError::config(format!(
                    "Failed to create log directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;

            let log_file_path = dir.join(LOG_FILE_NAME);
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file_path)
                .map_err(|e| {
                    PaperSeekError::config(format!(
                        "Failed to open log file {}: {}",
                        log_file_path.display(),
                        e
                    ))
                })?;

            Some(
                fmt::layer()
                    .with_writer(log_file)
                    .with_target(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PaperSeekError::config(format!("Logging already initialized: {}", e)))?;

    tracing::debug!("Logging initialized: level={}", level);
    Ok(())
}

/// Parse string to tracing Level
pub fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to INFO", level);
            Level::INFO
        }
    }
}
