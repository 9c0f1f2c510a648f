//! Timers.
//!
//! Besides plain re-exports this module provides [`ticker`], the interval used
//! for periodic volume reconciliation. A ticker never bursts: if the loop
//! falls behind, missed ticks are skipped rather than replayed back to back.

pub use std::time::{Duration, Instant};
pub use tokio::time::{interval, sleep, timeout, Interval, MissedTickBehavior};

/// Error returned by [`timeout`] when the deadline passes first.
pub use tokio::time::error::Elapsed;

/// Creates a fixed-period interval whose first tick fires one full `period`
/// after creation.
///
/// Unlike [`interval`], the first tick is not immediate, and late ticks are
/// skipped.
///
/// # Panics
///
/// Panics if `period` is zero. Configuration validation rejects a zero
/// period before a ticker is ever built.
pub fn ticker(period: Duration) -> Interval {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
