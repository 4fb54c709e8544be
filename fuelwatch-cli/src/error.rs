//! CLI error type.

use std::fmt;
use std::io;

use fuelwatch::config::ConfigError;
use fuelwatch::logging::LoggingError;
use fuelwatch::meter::MeterError;

/// Errors that end a CLI command.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or unreadable configuration.
    Config(String),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// The telemetry source could not be opened.
    Source { source: String, error: io::Error },
    /// Reading telemetry or writing reports failed.
    Io(io::Error),
    /// The meter could not be built.
    Meter(MeterError),
    /// Async runtime could not be started.
    Runtime(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "{}", e),
            CliError::Source { source, error } => {
                write!(f, "Failed to open telemetry {}: {}", source, error)
            }
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Meter(e) => write!(f, "Failed to start meter: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(_) => None,
            CliError::Logging(e) => Some(e),
            CliError::Source { error, .. } => Some(error),
            CliError::Io(e) | CliError::Runtime(e) => Some(e),
            CliError::Meter(e) => Some(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<MeterError> for CliError {
    fn from(e: MeterError) -> Self {
        CliError::Meter(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
