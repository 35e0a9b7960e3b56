//! Per-request transfer policy.

use std::time::Duration;

/// Knobs bounding a single transfer attempt.
///
/// Everything here applies per attempt; a multi-attempt budget lives in
/// [`RetryPolicy::total_timeout`](crate::retry::RetryPolicy). The default
/// policy imposes no limits and uses the driver's own buffer size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPolicy {
    /// Bound on the whole attempt. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Bound on connection establishment (DNS + handshakes).
    pub connect_timeout: Option<Duration>,
    /// Abort the attempt when throughput stays below this many bytes/s...
    pub low_speed_limit: u32,
    /// ...for this long. Both must be set for the limit to apply.
    pub low_speed_time: Option<Duration>,
    /// Outbound rate cap in bytes/s, 0 = uncapped.
    pub send_speed_limit: u64,
    /// Inbound rate cap in bytes/s, 0 = uncapped.
    pub recv_speed_limit: u64,
    /// Driver I/O buffer size in bytes, 0 = driver default.
    pub buffer_size: usize,
}

impl RequestPolicy {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Abort attempts slower than `bytes_per_sec` for `period`.
    #[must_use]
    pub fn with_low_speed(mut self, bytes_per_sec: u32, period: Duration) -> Self {
        self.low_speed_limit = bytes_per_sec;
        self.low_speed_time = Some(period);
        self
    }

    #[must_use]
    pub fn with_send_speed_limit(mut self, bytes_per_sec: u64) -> Self {
        self.send_speed_limit = bytes_per_sec;
        self
    }

    #[must_use]
    pub fn with_recv_speed_limit(mut self, bytes_per_sec: u64) -> Self {
        self.recv_speed_limit = bytes_per_sec;
        self
    }

    #[must_use]
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_unbounded() {
        let policy = RequestPolicy::default();
        assert!(policy.timeout.is_none());
        assert!(policy.connect_timeout.is_none());
        assert_eq!(policy.low_speed_limit, 0);
        assert_eq!(policy.buffer_size, 0);
    }

    #[test]
    fn chainers_compose() {
        let policy = RequestPolicy::default()
            .with_timeout(Duration::from_secs(5))
            .with_low_speed(1024, Duration::from_secs(10))
            .with_buffer_size(64 * 1024);
        assert_eq!(policy.timeout, Some(Duration::from_secs(5)));
        assert_eq!(policy.low_speed_limit, 1024);
        assert_eq!(policy.low_speed_time, Some(Duration::from_secs(10)));
        assert_eq!(policy.buffer_size, 64 * 1024);
    }
}
