//! Small time helpers shared across the engine.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as fractional seconds since the Unix epoch.
///
/// Retry schedules and attempt records are expressed in this timescale so
/// that backoff closures can return absolute timestamps.
#[inline]
pub fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
