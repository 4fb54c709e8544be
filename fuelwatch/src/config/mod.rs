//! INI configuration file.
//!
//! Settings live in `<config dir>/fuelwatch/config.ini`:
//!
//! ```ini
//! [telemetry]
//! marker = fuel_econ
//! field = engine_fuel_rate
//! command = submsg pentad
//!
//! [clock]
//! regression_tolerance_ms = 0
//!
//! [report]
//! format = text
//!
//! [logging]
//! level = info
//! directory = /var/log/fuelwatch
//! ```
//!
//! A missing file yields defaults. Every key is addressable as
//! `section.key` through [`ConfigKey`], which the CLI `config` commands use.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::clock::ClockConfig;
use crate::meter::MeterConfig;
use crate::report::ReportFormat;
use crate::telemetry::{DEFAULT_FIELD, DEFAULT_MARKER};

/// Errors loading, saving, or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading or writing the file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid INI.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A value failed validation.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The key is not a known `section.key` name.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[telemetry]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Case-insensitive relevance marker.
    pub marker: String,
    /// Flow-rate field label.
    pub field: String,
    /// Upstream command to spawn instead of reading stdin.
    pub command: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            field: DEFAULT_FIELD.to_string(),
            command: None,
        }
    }
}

/// `[clock]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockSettings {
    /// Backward step tolerated before a regression is declared.
    pub regression_tolerance_ms: u64,
}

/// `[report]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSettings {
    /// Output layout.
    pub format: ReportFormat,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default level filter.
    pub level: String,
    /// Directory for rolling log files; file logging is off when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub telemetry: TelemetrySettings,
    pub clock: ClockSettings,
    pub report: ReportSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini.write_to_file(path)?;
        Ok(())
    }

    /// Meter settings derived from this file.
    pub fn meter_config(&self) -> MeterConfig {
        MeterConfig {
            marker: self.telemetry.marker.clone(),
            field: self.telemetry.field.clone(),
            clock: ClockConfig::new(Duration::from_millis(self.clock.regression_tolerance_ms)),
        }
    }

    /// Displayable listing of every key.
    pub fn listing(&self) -> ConfigListing<'_> {
        ConfigListing { config: self }
    }
}

/// All settings grouped by section, with overrides annotated.
///
/// ```text
/// [report]
/// format = csv  # default: text
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConfigListing<'a> {
    config: &'a ConfigFile,
}

impl fmt::Display for ConfigListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let defaults = ConfigFile::default();
        let mut section = None;

        for key in ConfigKey::all() {
            if section != Some(key.section()) {
                if section.is_some() {
                    writeln!(f)?;
                }
                writeln!(f, "[{}]", key.section())?;
                section = Some(key.section());
            }

            let value = display_value(key.get(self.config));
            if key.is_default(self.config) {
                writeln!(f, "{} = {}", key.key_name(), value)?;
            } else {
                let default = display_value(key.get(&defaults));
                writeln!(f, "{} = {}  # default: {}", key.key_name(), value, default)?;
            }
        }
        Ok(())
    }
}

/// Placeholder for unset optional values.
pub const NOT_SET: &str = "(not set)";

/// A key's value for display, with [`NOT_SET`] for empty values.
pub fn display_value(value: String) -> String {
    if value.is_empty() {
        NOT_SET.to_string()
    } else {
        value
    }
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Directory holding fuelwatch configuration.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fuelwatch")
}

/// A settable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    TelemetryMarker,
    TelemetryField,
    TelemetryCommand,
    ClockRegressionToleranceMs,
    ReportFormat,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::TelemetryMarker,
            ConfigKey::TelemetryField,
            ConfigKey::TelemetryCommand,
            ConfigKey::ClockRegressionToleranceMs,
            ConfigKey::ReportFormat,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingDirectory,
        ]
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::TelemetryMarker => "telemetry.marker",
            ConfigKey::TelemetryField => "telemetry.field",
            ConfigKey::TelemetryCommand => "telemetry.command",
            ConfigKey::ClockRegressionToleranceMs => "clock.regression_tolerance_ms",
            ConfigKey::ReportFormat => "report.format",
            ConfigKey::LoggingLevel => "logging.level",
            ConfigKey::LoggingDirectory => "logging.directory",
        }
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        self.name().split_once('.').map_or("", |(section, _)| section)
    }

    /// Key name within the section.
    pub fn key_name(&self) -> &'static str {
        self.name().split_once('.').map_or("", |(_, key)| key)
    }

    /// Current value as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::TelemetryMarker => config.telemetry.marker.clone(),
            ConfigKey::TelemetryField => config.telemetry.field.clone(),
            ConfigKey::TelemetryCommand => config.telemetry.command.clone().unwrap_or_default(),
            ConfigKey::ClockRegressionToleranceMs => {
                config.clock.regression_tolerance_ms.to_string()
            }
            ConfigKey::ReportFormat => config.report.format.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Whether the current value matches the built-in default.
    pub fn is_default(&self, config: &ConfigFile) -> bool {
        self.get(config) == self.get(&ConfigFile::default())
    }

    /// Validate and set a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason,
        };

        match self {
            ConfigKey::TelemetryMarker => {
                if value.is_empty() {
                    return Err(invalid("marker must not be empty".to_string()));
                }
                config.telemetry.marker = value.to_string();
            }
            ConfigKey::TelemetryField => {
                if value.is_empty() {
                    return Err(invalid("field must not be empty".to_string()));
                }
                config.telemetry.field = value.to_string();
            }
            ConfigKey::TelemetryCommand => {
                config.telemetry.command = non_empty(value).map(str::to_string);
            }
            ConfigKey::ClockRegressionToleranceMs => {
                config.clock.regression_tolerance_ms =
                    value.parse().map_err(|e| invalid(format!("{}", e)))?;
            }
            ConfigKey::ReportFormat => {
                config.report.format = value.parse().map_err(invalid)?;
            }
            ConfigKey::LoggingLevel => {
                value
                    .parse::<LevelFilter>()
                    .map_err(|e| invalid(e.to_string()))?;
                config.logging.level = value.to_lowercase();
            }
            ConfigKey::LoggingDirectory => {
                config.logging.directory = non_empty(value).map(PathBuf::from);
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .find(|key| key.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
