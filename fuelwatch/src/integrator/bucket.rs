//! Hour-boundary bucketing of consumption.
//!
//! Consumption is attributed to wall-clock hour buckets keyed by
//! `epoch_ms / 3_600_000`. When a sample lands in a later bucket than the
//! current one, the in-progress bucket is closed: its consumption becomes
//! the "latest hour" figure and a new bucket starts at the current total.
//!
//! A gap spanning several hours closes only one bucket. All consumption
//! since the last snapshot, across every skipped hour, is folded into the
//! single "latest hour" figure.

use super::state::IntegratorState;

/// Length of one bucket in milliseconds.
pub const HOUR_MS: u64 = 3_600_000;

/// Bucket index for an epoch-millisecond timestamp.
pub fn hour_index(epoch_ms: u64) -> u64 {
    epoch_ms / HOUR_MS
}

/// Update the hour bucket for a sample observed at `now_ms`.
///
/// Must be called after the sample's consumption has been added to
/// `state.total_micro_l`.
///
/// # Returns
///
/// `true` if a bucket was closed by this sample.
pub fn on_sample(state: &mut IntegratorState, now_ms: u64) -> bool {
    let index = hour_index(now_ms);

    let Some(current) = state.current_hour_index else {
        state.current_hour_index = Some(index);
        return false;
    };

    if index <= current {
        return false;
    }

    state.latest_hourly_micro_l = state.total_micro_l - state.micro_l_at_hour_start;
    state.micro_l_at_hour_start = state.total_micro_l;
    state.current_hour_index = Some(index);
    true
}
