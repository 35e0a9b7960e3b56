//! Engine configuration.
//!
//! A [`ClientConfig`] is consumed once at engine construction; the worker
//! thread applies the multi-handle settings and sizes the concurrency
//! budget and speed windows from it.

use std::time::Duration;

/// Settings for an [`HttpClient`](crate::HttpClient) instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Upper bound on concurrently active transfers. Sizes the permit
    /// semaphore and is passed to the driver as its connection-cache
    /// advisory.
    pub max_connections: usize,
    /// Driver-level cap on concurrent connections per origin.
    pub max_host_connections: usize,
    /// Driver-level cap on concurrent connections across the whole pool.
    pub max_total_connections: usize,
    /// Ceiling on a single worker poll. Lifecycle commands issued from
    /// other threads are observed within at most one poll quantum even if
    /// the wakeup path is unavailable.
    pub poll_timeout: Duration,
    /// Capacity of the per-direction speed tracking windows, in samples.
    pub speed_track_window: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_connections: 8,
            max_host_connections: 2,
            max_total_connections: 4,
            poll_timeout: Duration::from_millis(100),
            speed_track_window: 128,
        }
    }
}

impl ClientConfig {
    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }
        if self.max_connections > 10_000 {
            return Err("max_connections must not exceed 10000".to_string());
        }
        if self.poll_timeout.is_zero() {
            return Err("poll_timeout must be greater than zero".to_string());
        }
        if self.poll_timeout > Duration::from_secs(60) {
            return Err("poll_timeout must not exceed 60 seconds".to_string());
        }
        if self.speed_track_window == 0 {
            return Err("speed_track_window must be at least 1".to_string());
        }
        Ok(())
    }

    /// Set the active-transfer bound.
    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-origin connection cap.
    #[must_use]
    pub fn with_max_host_connections(mut self, max: usize) -> Self {
        self.max_host_connections = max;
        self
    }

    /// Set the pool-wide connection cap.
    #[must_use]
    pub fn with_max_total_connections(mut self, max: usize) -> Self {
        self.max_total_connections = max;
        self
    }

    /// Set the worker poll ceiling.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the speed window capacity.
    #[must_use]
    pub fn with_speed_track_window(mut self, samples: usize) -> Self {
        self.speed_track_window = samples;
        self
    }
}
