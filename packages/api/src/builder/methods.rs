//! Per-attempt policy chainers.

use std::time::Duration;

use super::core::RequestBuilder;

impl<'a> RequestBuilder<'a> {
    /// Bound each attempt to `timeout`.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.policy = self.policy.with_timeout(timeout);
        self
    }

    /// Bound connection establishment to `timeout`.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.policy = self.policy.with_connect_timeout(timeout);
        self
    }

    /// Abort attempts slower than `bytes_per_sec` for `period`.
    #[must_use]
    pub fn low_speed(mut self, bytes_per_sec: u32, period: Duration) -> Self {
        self.policy = self.policy.with_low_speed(bytes_per_sec, period);
        self
    }

    /// Cap outbound throughput.
    #[must_use]
    pub fn send_speed_limit(mut self, bytes_per_sec: u64) -> Self {
        self.policy = self.policy.with_send_speed_limit(bytes_per_sec);
        self
    }

    /// Cap inbound throughput.
    #[must_use]
    pub fn recv_speed_limit(mut self, bytes_per_sec: u64) -> Self {
        self.policy = self.policy.with_recv_speed_limit(bytes_per_sec);
        self
    }

    /// Set the driver's I/O buffer size.
    #[must_use]
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.policy = self.policy.with_buffer_size(bytes);
        self
    }
}
