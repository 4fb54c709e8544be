//! Fixed-point integration of fuel flow over time.
//!
//! The integrator turns an irregular sequence of (rate, timestamp) samples
//! into a cumulative consumption figure and a "latest completed hour"
//! figure. All arithmetic is unsigned integer.
//!
//! # Sample handling
//!
//! ```text
//! first sample ──────► baseline only (warm-up, no delta)
//! dt_ms < 0 ─────────► baseline reset (regression, no delta)
//! dt_ms >= 0 ────────► delta = rate × dt_ms / 3_600_000, added to total
//!                      └── then the hour bucket is updated
//! ```
//!
//! The division remainder is dropped on every sample rather than carried
//! forward, so very short intervals at low rates integrate to zero.
//!
//! # Example
//!
//! ```
//! use fuelwatch::integrator::{Integrator, Sample};
//!
//! let mut integrator = Integrator::new();
//! // 3600 L/h
//! integrator.accept(Sample::new(3_600_000_000, 1_000));
//! let result = integrator.accept(Sample::new(3_600_000_000, 2_000));
//! assert_eq!(result.total_micro_l, 1_000_000); // one liter
//! ```

mod bucket;
mod state;

pub use bucket::{hour_index, on_sample, HOUR_MS};
pub use state::{IntegratorState, Sample};

use tracing::warn;

/// What the integrator did with a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// First sample; established the baseline only.
    WarmUp,
    /// Timestamp earlier than the previous sample; baseline reset.
    Regression {
        /// How far back the timestamp stepped, in milliseconds.
        behind_ms: u64,
    },
    /// Consumption was integrated.
    Integrated {
        /// Elapsed time since the previous sample.
        dt_ms: u64,
        /// Consumption added to the total.
        delta_micro_l: u64,
    },
}

/// Totals after accepting one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationResult {
    /// How the sample was handled.
    pub outcome: SampleOutcome,
    /// Cumulative consumption in micro-liters.
    pub total_micro_l: u64,
    /// Consumption of the most recently completed hour.
    pub latest_hourly_micro_l: u64,
    /// Whether this sample closed an hour bucket.
    pub rolled_over: bool,
}

/// Consumed volume for `rate_micro_l_per_h` sustained over `dt_ms`.
///
/// The product is formed in 128 bits; a result beyond `u64` saturates.
pub fn integrate(rate_micro_l_per_h: u64, dt_ms: u64) -> u64 {
    let volume = u128::from(rate_micro_l_per_h) * u128::from(dt_ms) / u128::from(HOUR_MS);
    u64::try_from(volume).unwrap_or(u64::MAX)
}

/// Stateful fuel-flow integrator.
#[derive(Debug, Default)]
pub struct Integrator {
    state: IntegratorState,
}

impl Integrator {
    /// Create an integrator with an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from an existing state.
    pub fn with_state(state: IntegratorState) -> Self {
        Self { state }
    }

    /// Accept one sample and return the updated totals.
    pub fn accept(&mut self, sample: Sample) -> IntegrationResult {
        let now_ms = sample.observed_at_ms;

        let last_sample_ms = self.state.last_sample_ms;

        let outcome = match last_sample_ms {
            None => SampleOutcome::WarmUp,
            Some(last) if now_ms < last => SampleOutcome::Regression {
                behind_ms: last - now_ms,
            },
            Some(last) => {
                let dt_ms = now_ms - last;
                let delta_micro_l =
                    self.add_consumption(integrate(sample.rate_micro_l_per_h, dt_ms));
                SampleOutcome::Integrated {
                    dt_ms,
                    delta_micro_l,
                }
            }
        };
        self.state.last_sample_ms = Some(now_ms);

        let rolled_over = on_sample(&mut self.state, now_ms);

        IntegrationResult {
            outcome,
            total_micro_l: self.state.total_micro_l,
            latest_hourly_micro_l: self.state.latest_hourly_micro_l,
            rolled_over,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> &IntegratorState {
        &self.state
    }

    /// Add to the running total, saturating at `u64::MAX`.
    ///
    /// Returns the amount actually added.
    fn add_consumption(&mut self, delta_micro_l: u64) -> u64 {
        let total = self.state.total_micro_l.saturating_add(delta_micro_l);
        let applied = total - self.state.total_micro_l;
        if applied < delta_micro_l {
            warn!(
                total_micro_l = total,
                dropped_micro_l = delta_micro_l - applied,
                "Consumption total saturated"
            );
        }
        self.state.total_micro_l = total;
        applied
    }
}
