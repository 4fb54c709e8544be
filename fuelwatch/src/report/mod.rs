//! Consumption reports.
//!
//! One [`Report`] is produced per accepted sample. Values arrive already
//! converted to fixed two-digit liters and gallons; this module only lays
//! them out.
//!
//! | Format | Layout                                    |
//! |--------|-------------------------------------------|
//! | `text` | multi-line block per report               |
//! | `json` | one JSON object per line                  |
//! | `csv`  | header row, then one row per report       |

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;

use crate::units::Volume;

/// Column names for CSV output.
const CSV_HEADER: &str =
    "timestamp,raw_rate,total_liters,total_gallons,last_hour_liters,last_hour_gallons";

/// A consumption report for one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Flow-rate text as read from the telemetry line.
    pub raw_rate: String,
    /// Observation time in epoch milliseconds.
    pub observed_at_ms: u64,
    /// Observation time, RFC 3339 in UTC.
    pub timestamp: String,
    /// Consumption since start.
    pub total: Volume,
    /// Consumption of the latest completed hour.
    pub last_hour: Volume,
    /// Whether this sample closed an hour.
    pub rolled_over: bool,
}

impl Report {
    /// Build a report from integrator totals.
    pub fn new(
        raw_rate: impl Into<String>,
        observed_at_ms: u64,
        total_micro_l: u64,
        latest_hourly_micro_l: u64,
        rolled_over: bool,
    ) -> Self {
        Self {
            raw_rate: raw_rate.into(),
            observed_at_ms,
            timestamp: utc_timestamp(observed_at_ms).to_rfc3339_opts(SecondsFormat::Millis, true),
            total: Volume::from_micro_l(total_micro_l),
            last_hour: Volume::from_micro_l(latest_hourly_micro_l),
            rolled_over,
        }
    }

    /// Observation time in the local timezone.
    pub fn local_time(&self) -> DateTime<Local> {
        utc_timestamp(self.observed_at_ms).with_timezone(&Local)
    }

    /// One CSV row (no trailing newline).
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.timestamp,
            self.raw_rate,
            self.total.liters,
            self.total.gallons,
            self.last_hour.liters,
            self.last_hour.gallons
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------------------------")?;
        writeln!(
            f,
            "Time:            {}",
            self.local_time().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "Fuel rate:       {} L/h", self.raw_rate)?;
        writeln!(
            f,
            "Total consumed:  {} L / {} gal",
            self.total.liters, self.total.gallons
        )?;
        write!(
            f,
            "Last hour:       {} L / {} gal",
            self.last_hour.liters, self.last_hour.gallons
        )
    }
}

fn utc_timestamp(epoch_ms: u64) -> DateTime<Utc> {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}

/// Output layout for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable block.
    #[default]
    Text,
    /// JSON lines.
    Json,
    /// Comma-separated values.
    Csv,
}

impl ReportFormat {
    /// Config/CLI name of the format.
    pub fn name(&self) -> &'static str {
        match self {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(format!(
                "unknown report format '{}' (expected text, json or csv)",
                other
            )),
        }
    }
}

/// Writes reports to an output stream in a chosen format.
#[derive(Debug)]
pub struct ReportWriter<W: Write> {
    out: W,
    format: ReportFormat,
    header_written: bool,
}

impl<W: Write> ReportWriter<W> {
    /// Create a writer.
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self {
            out,
            format,
            header_written: false,
        }
    }

    /// Write one report and flush.
    pub fn write(&mut self, report: &Report) -> io::Result<()> {
        match self.format {
            ReportFormat::Text => writeln!(self.out, "{}", report)?,
            ReportFormat::Json => {
                serde_json::to_writer(&mut self.out, report)?;
                writeln!(self.out)?;
            }
            ReportFormat::Csv => {
                if !self.header_written {
                    writeln!(self.out, "{}", CSV_HEADER)?;
                    self.header_written = true;
                }
                writeln!(self.out, "{}", report.csv_row())?;
            }
        }
        self.out.flush()
    }

    /// Consume the writer, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }
}
