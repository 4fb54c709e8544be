//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use fuelwatch::clock::ClockConfig;
use fuelwatch::config::ConfigFile;
use fuelwatch::meter::MeterConfig;
use fuelwatch::report::ReportFormat;
use fuelwatch::telemetry::TelemetrySource;

/// Report format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FormatArg {
    /// Multi-line block per report
    Text,
    /// One JSON object per line
    Json,
    /// Header row, then one row per report
    Csv,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
            FormatArg::Csv => ReportFormat::Csv,
        }
    }
}

/// Resolve the telemetry source: `--file` > `--command` > config command > stdin.
pub fn resolve_source(
    file: Option<PathBuf>,
    command: Option<String>,
    config: &ConfigFile,
) -> TelemetrySource {
    if let Some(path) = file {
        return TelemetrySource::File(path);
    }
    command
        .or_else(|| config.telemetry.command.clone())
        .map(TelemetrySource::Command)
        .unwrap_or(TelemetrySource::Stdin)
}

/// Resolve the report format from CLI args and config.
pub fn resolve_format(cli_format: Option<FormatArg>, config: &ConfigFile) -> ReportFormat {
    cli_format
        .map(ReportFormat::from)
        .unwrap_or(config.report.format)
}

/// Resolve meter settings; CLI values take precedence over config.
pub fn resolve_meter_config(
    marker: Option<String>,
    field: Option<String>,
    tolerance_ms: Option<u64>,
    config: &ConfigFile,
) -> MeterConfig {
    let mut meter = config.meter_config();
    if let Some(marker) = marker {
        meter.marker = marker;
    }
    if let Some(field) = field {
        meter.field = field;
    }
    if let Some(ms) = tolerance_ms {
        meter.clock = ClockConfig::new(Duration::from_millis(ms));
    }
    meter
}
