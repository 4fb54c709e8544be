//! Sample and accumulator state types.

/// One flow-rate observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Flow rate in micro-liters per hour.
    pub rate_micro_l_per_h: u64,
    /// Observation time in epoch milliseconds.
    pub observed_at_ms: u64,
}

impl Sample {
    /// Create a new sample.
    pub fn new(rate_micro_l_per_h: u64, observed_at_ms: u64) -> Self {
        Self {
            rate_micro_l_per_h,
            observed_at_ms,
        }
    }
}

/// Accumulated consumption since process start.
///
/// Created zeroed, mutated once per accepted sample. `total_micro_l` never
/// decreases and is always at least `micro_l_at_hour_start`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegratorState {
    /// Cumulative consumption in micro-liters.
    pub total_micro_l: u64,
    /// Timestamp of the previous accepted sample.
    pub last_sample_ms: Option<u64>,
    /// Hour bucket (`epoch_ms / 3_600_000`) of the last processed sample.
    pub current_hour_index: Option<u64>,
    /// `total_micro_l` when the current hour bucket began.
    pub micro_l_at_hour_start: u64,
    /// Consumption attributed to the most recently completed hour bucket.
    pub latest_hourly_micro_l: u64,
}

impl IntegratorState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumption accumulated so far in the in-progress hour.
    pub fn current_hour_micro_l(&self) -> u64 {
        self.total_micro_l - self.micro_l_at_hour_start
    }

    /// Whether the first sample has established a baseline.
    pub fn is_warmed_up(&self) -> bool {
        self.last_sample_ms.is_some()
    }
}
