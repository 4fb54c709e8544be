//! Wall-clock sampling at millisecond resolution.
//!
//! Every accepted observation is stamped with epoch milliseconds built from
//! the clock's whole seconds plus its sub-second milliseconds. The
//! [`ClockSampler`] also watches for the clock stepping backward:
//!
//! - a step back within the configured tolerance is clamped to the previous
//!   reading, so jitter never looks like a regression;
//! - a larger step back is passed through and flagged as a regression, and
//!   the integrator resets its baseline on it;
//! - a reading before the Unix epoch is rejected.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced while sampling the clock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The clock reports a time before 1970-01-01T00:00:00Z.
    #[error("Clock reads {seconds}s before the Unix epoch")]
    BeforeEpoch { seconds: i64 },
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for tests and replays.
///
/// Clones share the same time, so a test can keep one handle while the
/// sampler owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    epoch_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock reading `epoch_ms` milliseconds since the epoch.
    pub fn new(epoch_ms: i64) -> Self {
        Self {
            epoch_ms: Arc::new(AtomicI64::new(epoch_ms)),
        }
    }

    /// Set the current time.
    pub fn set_ms(&self, epoch_ms: i64) {
        self.epoch_ms.store(epoch_ms, Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by_ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.epoch_ms.fetch_add(by_ms, Ordering::SeqCst);
    }

    /// Move the clock backward.
    pub fn rewind(&self, by: Duration) {
        let by_ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.epoch_ms.fetch_sub(by_ms, Ordering::SeqCst);
    }

    /// Current reading in epoch milliseconds.
    pub fn epoch_ms(&self) -> i64 {
        self.epoch_ms.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.epoch_ms()).unwrap_or_default()
    }
}

/// Configuration for the clock sampler.
#[derive(Debug, Clone, Default)]
pub struct ClockConfig {
    /// How far the clock may step backward before it counts as a regression.
    pub regression_tolerance: Duration,
}

impl ClockConfig {
    /// Create a configuration with the given regression tolerance.
    pub fn new(regression_tolerance: Duration) -> Self {
        Self {
            regression_tolerance,
        }
    }
}

/// One timestamp produced by the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// Epoch milliseconds to attribute to the observation.
    pub observed_at_ms: u64,
    /// The clock went backward by more than the tolerance.
    pub regressed: bool,
    /// The clock went backward within the tolerance and was held.
    pub clamped: bool,
}

/// Produces epoch-millisecond timestamps and classifies clock steps.
#[derive(Debug)]
pub struct ClockSampler {
    clock: Box<dyn Clock>,
    config: ClockConfig,
    last_ms: Option<u64>,
}

impl ClockSampler {
    /// Create a sampler over the system clock.
    pub fn system(config: ClockConfig) -> Self {
        Self::new(Box::new(SystemClock), config)
    }

    /// Create a sampler over an arbitrary clock.
    pub fn new(clock: Box<dyn Clock>, config: ClockConfig) -> Self {
        Self {
            clock,
            config,
            last_ms: None,
        }
    }

    /// Take a timestamp for the next observation.
    ///
    /// # Errors
    ///
    /// [`ClockError::BeforeEpoch`] if the clock reads before 1970. The
    /// sampler's previous reading is left untouched in that case.
    pub fn sample(&mut self) -> Result<ClockReading, ClockError> {
        let raw_ms = epoch_millis(&self.clock.now())?;
        let tolerance_ms =
            u64::try_from(self.config.regression_tolerance.as_millis()).unwrap_or(u64::MAX);

        let reading = match self.last_ms {
            Some(last) if raw_ms < last => {
                if last - raw_ms <= tolerance_ms {
                    ClockReading {
                        observed_at_ms: last,
                        regressed: false,
                        clamped: true,
                    }
                } else {
                    ClockReading {
                        observed_at_ms: raw_ms,
                        regressed: true,
                        clamped: false,
                    }
                }
            }
            _ => ClockReading {
                observed_at_ms: raw_ms,
                regressed: false,
                clamped: false,
            },
        };

        self.last_ms = Some(reading.observed_at_ms);
        Ok(reading)
    }

    /// The previous reading handed out, if any.
    pub fn last_ms(&self) -> Option<u64> {
        self.last_ms
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }
}

/// Combine whole seconds and sub-second milliseconds into epoch milliseconds.
///
/// Leap-second readings (sub-second part of 1000ms or more) are held at 999.
pub fn epoch_millis(at: &DateTime<Utc>) -> Result<u64, ClockError> {
    let seconds = at.timestamp();
    let whole = u64::try_from(seconds).map_err(|_| ClockError::BeforeEpoch { seconds })?;
    let sub_ms = u64::from(at.timestamp_subsec_millis().min(999));
    Ok(whole.saturating_mul(1000).saturating_add(sub_ms))
}
