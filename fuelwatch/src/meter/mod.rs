//! Line-to-report pipeline.
//!
//! The [`Meter`] owns the one [`IntegratorState`] of a session and drives
//! every stage for each telemetry line:
//!
//! ```text
//! line ─► FieldExtractor ─► parse_rate ─► ClockSampler ─► Integrator ─► Report
//!            │                 │               │
//!            └ irrelevant      └ malformed     └ before epoch
//!              Ok(None)          Err, dropped    Err, dropped
//! ```
//!
//! A dropped sample never touches the integrator state. The meter is meant
//! to be owned by the task consuming lines; reports are handed out by value.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::{Clock, ClockConfig, ClockError, ClockSampler, SystemClock};
use crate::integrator::{Integrator, IntegratorState, Sample, SampleOutcome};
use crate::rate::{parse_rate, RateError};
use crate::report::Report;
use crate::telemetry::{Extraction, FieldExtractor, DEFAULT_FIELD, DEFAULT_MARKER};
use crate::units::Volume;

/// Errors for a single telemetry line.
///
/// None of these stop the meter; the line is dropped and the next one can
/// be processed.
#[derive(Debug, Error)]
pub enum MeterError {
    /// The flow-rate text could not be parsed.
    #[error(transparent)]
    Rate(#[from] RateError),

    /// The clock could not produce a valid timestamp.
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// The marker or field could not be compiled into a pattern.
    #[error("Invalid telemetry pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Meter configuration.
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// Case-insensitive token that marks relevant lines.
    pub marker: String,
    /// Label of the flow-rate field.
    pub field: String,
    /// Clock sampling settings.
    pub clock: ClockConfig,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            field: DEFAULT_FIELD.to_string(),
            clock: ClockConfig::default(),
        }
    }
}

/// Counters for a metering session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterStats {
    /// Lines handed to the meter.
    pub lines_read: u64,
    /// Lines carrying the marker and field.
    pub relevant_lines: u64,
    /// Reports produced.
    pub reports: u64,
    /// Samples dropped for an unparseable rate.
    pub malformed_samples: u64,
    /// Rates truncated to six fractional digits.
    pub precision_overflows: u64,
    /// Samples that reset the baseline after the clock stepped back.
    pub clock_regressions: u64,
    /// Samples dropped for an invalid clock reading.
    pub clock_errors: u64,
    /// Hour buckets closed.
    pub rollovers: u64,
}

/// Fuel consumption meter over a stream of telemetry lines.
#[derive(Debug)]
pub struct Meter {
    extractor: FieldExtractor,
    sampler: ClockSampler,
    integrator: Integrator,
    stats: MeterStats,
}

impl Meter {
    /// Create a meter on the system clock.
    pub fn new(config: MeterConfig) -> Result<Self, MeterError> {
        Self::with_clock(config, Box::new(SystemClock))
    }

    /// Create a meter on an arbitrary clock.
    pub fn with_clock(config: MeterConfig, clock: Box<dyn Clock>) -> Result<Self, MeterError> {
        let extractor = FieldExtractor::new(&config.marker, &config.field)?;
        Ok(Self {
            extractor,
            sampler: ClockSampler::new(clock, config.clock),
            integrator: Integrator::new(),
            stats: MeterStats::default(),
        })
    }

    /// Process one telemetry line.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` if the line is not relevant
    /// - `Ok(Some(report))` if a sample was accepted
    ///
    /// # Errors
    ///
    /// [`MeterError::Rate`] or [`MeterError::Clock`] if the sample had to be
    /// dropped. The integrator state is unchanged.
    pub fn process_line(&mut self, line: &str) -> Result<Option<Report>, MeterError> {
        self.stats.lines_read += 1;

        let raw_rate = match self.extractor.extract(line) {
            Extraction::Irrelevant => return Ok(None),
            Extraction::Rate(raw) => raw,
        };
        self.stats.relevant_lines += 1;

        let rate = match parse_rate(raw_rate) {
            Ok(rate) => rate,
            Err(e) => {
                self.stats.malformed_samples += 1;
                return Err(e.into());
            }
        };
        if rate.precision_overflow() {
            self.stats.precision_overflows += 1;
            debug!(
                raw_rate,
                truncated_digits = rate.truncated_digits,
                "Flow rate truncated to 6 fractional digits"
            );
        }

        let reading = match self.sampler.sample() {
            Ok(reading) => reading,
            Err(e) => {
                self.stats.clock_errors += 1;
                return Err(e.into());
            }
        };
        if reading.clamped {
            debug!(
                observed_at_ms = reading.observed_at_ms,
                "Clock stepped back within tolerance; holding previous timestamp"
            );
        }

        let result = self
            .integrator
            .accept(Sample::new(rate.micro_units, reading.observed_at_ms));

        match result.outcome {
            SampleOutcome::WarmUp => {
                debug!(observed_at_ms = reading.observed_at_ms, "Baseline established");
            }
            SampleOutcome::Regression { behind_ms } => {
                self.stats.clock_regressions += 1;
                warn!(behind_ms, "Clock regression; integration baseline reset");
            }
            SampleOutcome::Integrated {
                dt_ms,
                delta_micro_l,
            } => {
                debug!(dt_ms, delta_micro_l, "Sample integrated");
            }
        }

        if result.rolled_over {
            self.stats.rollovers += 1;
            info!(
                last_hour = %Volume::from_micro_l(result.latest_hourly_micro_l),
                "Hour bucket closed"
            );
        }

        self.stats.reports += 1;
        Ok(Some(Report::new(
            raw_rate,
            reading.observed_at_ms,
            result.total_micro_l,
            result.latest_hourly_micro_l,
            result.rolled_over,
        )))
    }

    /// Get the session counters.
    pub fn stats(&self) -> MeterStats {
        self.stats
    }

    /// Get the integrator state.
    pub fn state(&self) -> &IntegratorState {
        self.integrator.state()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;

    fn line(rate: &str) -> String {
        format!(
            r#"{{"msg":{{"PentaEngineStatus":{{"fuel_econ":{{"engine_fuel_rate":{}}}}}}}}}"#,
            rate
        )
    }

    fn meter(clock: &ManualClock) -> Meter {
        Meter::with_clock(MeterConfig::default(), Box::new(clock.clone())).unwrap()
    }

    #[test]
    fn test_irrelevant_line_yields_nothing() {
        let clock = ManualClock::new(1_000);
        let mut meter = meter(&clock);

        let result = meter.process_line(r#"{"msg":{"Odometry":{"odometer":12.0}}}"#);
        assert!(matches!(result, Ok(None)));
        assert_eq!(meter.stats().lines_read, 1);
        assert_eq!(meter.stats().relevant_lines, 0);
        assert_eq!(meter.state(), &IntegratorState::new());
    }

    #[test]
    fn test_first_line_reports_zero() {
        let clock = ManualClock::new(1_000);
        let mut meter = meter(&clock);

        let report = meter.process_line(&line("12.5")).unwrap().unwrap();
        assert_eq!(report.raw_rate, "12.5");
        assert_eq!(report.total.liters.to_string(), "0.00");
        assert_eq!(report.observed_at_ms, 1_000);
    }

    #[test]
    fn test_integrates_between_lines() {
        let clock = ManualClock::new(0);
        let mut meter = meter(&clock);

        meter.process_line(&line("3600")).unwrap();
        clock.advance(Duration::from_millis(1_500));
        let report = meter.process_line(&line("3600")).unwrap().unwrap();

        assert_eq!(meter.state().total_micro_l, 1_500_000);
        assert_eq!(report.total.liters.to_string(), "1.50");
        assert_eq!(report.total.gallons.to_string(), "0.39");
    }

    #[test]
    fn test_malformed_sample_leaves_state() {
        let clock = ManualClock::new(0);
        let mut meter = meter(&clock);
        meter.process_line(&line("3600")).unwrap();
        let before = meter.state().clone();

        clock.advance(Duration::from_secs(1));
        let err = meter.process_line(&line("null")).unwrap_err();
        assert!(matches!(err, MeterError::Rate(RateError::MalformedSample(_))));
        assert_eq!(meter.state(), &before);
        assert_eq!(meter.stats().malformed_samples, 1);
        assert_eq!(meter.stats().reports, 1);

        // The next good sample integrates over the whole gap
        clock.advance(Duration::from_secs(1));
        meter.process_line(&line("3600")).unwrap();
        assert_eq!(meter.state().total_micro_l, 2_000_000);
    }

    #[test]
    fn test_precision_overflow_is_counted() {
        let clock = ManualClock::new(0);
        let mut meter = meter(&clock);
        let report = meter.process_line(&line("1.12345678")).unwrap().unwrap();
        assert_eq!(report.raw_rate, "1.12345678");
        assert_eq!(meter.stats().precision_overflows, 1);
    }

    #[test]
    fn test_clock_regression_resets_baseline() {
        let clock = ManualClock::new(10_000_000);
        let mut meter = meter(&clock);
        meter.process_line(&line("3600")).unwrap();
        clock.advance(Duration::from_secs(1));
        meter.process_line(&line("3600")).unwrap();

        clock.rewind(Duration::from_secs(60));
        let report = meter.process_line(&line("3600")).unwrap().unwrap();
        assert_eq!(report.total.liters.to_string(), "1.00");
        assert_eq!(meter.stats().clock_regressions, 1);

        clock.advance(Duration::from_secs(2));
        meter.process_line(&line("3600")).unwrap();
        assert_eq!(meter.state().total_micro_l, 3_000_000);
    }

    #[test]
    fn test_clock_before_epoch_drops_sample() {
        let clock = ManualClock::new(-1_000);
        let mut meter = meter(&clock);
        let err = meter.process_line(&line("5")).unwrap_err();
        assert!(matches!(err, MeterError::Clock(_)));
        assert_eq!(meter.stats().clock_errors, 1);
        assert!(!meter.state().is_warmed_up());
    }

    #[test]
    fn test_marker_and_field_are_literal() {
        let config = MeterConfig {
            marker: String::new(),
            field: "[".to_string(),
            clock: ClockConfig::default(),
        };
        assert!(Meter::new(config).is_ok());
    }
}
