//! Throughput telemetry.
//!
//! The worker pushes each completed attempt's speeds into per-direction
//! sliding windows it owns exclusively, then publishes the aggregates into
//! cache-padded atomics so readers on other threads never contend with the
//! engine. Reads may trail the latest push slightly.

mod sliding_window;

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

pub use sliding_window::SlidingWindow;

/// Published window aggregates, in bytes per second.
#[derive(Debug, Default)]
pub struct SpeedStats {
    uplink_mean: CachePadded<AtomicU64>,
    downlink_mean: CachePadded<AtomicU64>,
    uplink_peak: CachePadded<AtomicU64>,
    downlink_peak: CachePadded<AtomicU64>,
}

/// Point-in-time copy of the speed aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeedSnapshot {
    /// Window-mean upload speed in bytes/s.
    pub uplink: f64,
    /// Window-mean download speed in bytes/s.
    pub downlink: f64,
    /// Window-max upload speed in bytes/s.
    pub peak_uplink: f64,
    /// Window-max download speed in bytes/s.
    pub peak_downlink: f64,
}

impl SpeedStats {
    /// Publish fresh aggregates. Worker-only.
    pub(crate) fn publish(&self, uplink: &SlidingWindow, downlink: &SlidingWindow) {
        self.uplink_mean
            .store(uplink.mean().to_bits(), Ordering::Relaxed);
        self.downlink_mean
            .store(downlink.mean().to_bits(), Ordering::Relaxed);
        self.uplink_peak
            .store(uplink.max().to_bits(), Ordering::Relaxed);
        self.downlink_peak
            .store(downlink.max().to_bits(), Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn uplink(&self) -> f64 {
        f64::from_bits(self.uplink_mean.load(Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn downlink(&self) -> f64 {
        f64::from_bits(self.downlink_mean.load(Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn peak_uplink(&self) -> f64 {
        f64::from_bits(self.uplink_peak.load(Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn peak_downlink(&self) -> f64 {
        f64::from_bits(self.downlink_peak.load(Ordering::Relaxed))
    }

    /// Read all four aggregates.
    #[must_use]
    pub fn snapshot(&self) -> SpeedSnapshot {
        SpeedSnapshot {
            uplink: self.uplink(),
            downlink: self.downlink(),
            peak_uplink: self.peak_uplink(),
            peak_downlink: self.peak_downlink(),
        }
    }
}
