//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays reserved for reports. When a log
//! directory is configured, a daily rolling file is written as well through
//! a non-blocking appender; the returned guard must be held until exit so
//! buffered lines are flushed.

use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self, time::LocalTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file name prefix inside the log directory.
const LOG_FILE_PREFIX: &str = "fuelwatch.log";

/// Errors setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured level is not a tracing level.
    #[error("Invalid log level '{0}'")]
    InvalidLevel(String),

    /// The log directory could not be created.
    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber was already installed.
    #[error("Failed to install log subscriber: {0}")]
    Init(String),
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level (`error`, `warn`, `info`, `debug`, `trace`, `off`).
    pub level: String,
    /// Force `debug` regardless of the configured level.
    pub verbose: bool,
    /// Directory for daily rolling log files.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Level used when `RUST_LOG` is not set.
    pub fn default_level(&self) -> Result<LevelFilter, LoggingError> {
        if self.verbose {
            return Ok(LevelFilter::DEBUG);
        }
        self.level
            .parse()
            .map_err(|_| LoggingError::InvalidLevel(self.level.clone()))
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` directives take precedence over the configured level.
///
/// # Returns
///
/// The file appender guard when file logging is enabled.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let level = config.default_level()?;
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::new(Rfc3339))
        .with_target(false);

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::new(Rfc3339));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    info!(
        level = %level,
        directory = ?config.directory,
        "Logging initialized"
    );
    Ok(guard)
}
