//! HTTP response model with per-attempt transfer timings.

use bytes::Bytes;
use http::StatusCode;

/// Timing breakdown for one transfer attempt.
///
/// Absolute timestamps are fractional seconds since the Unix epoch; phases
/// are durations. Phases are differenced from the driver's cumulative
/// counters, clamped at zero. A driver that cannot separate request
/// transmission from server latency reports zero for `request_send` and
/// folds the whole window into `start_transfer`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransferInfo {
    /// When the attempt was attached to the driver.
    pub start_at: f64,
    /// Time spent queued between submission and attachment.
    pub queue: std::time::Duration,
    /// Connection establishment, including name resolution.
    pub connect: std::time::Duration,
    /// TLS (or other application-layer) handshake.
    pub tls_handshake: std::time::Duration,
    /// From connection ready until the transfer begins.
    pub pre_transfer: std::time::Duration,
    /// Request transmission, when the driver can isolate it.
    pub request_send: std::time::Duration,
    /// From the end of `pre_transfer` until the first response byte.
    pub start_transfer: std::time::Duration,
    /// From attachment until the first body byte arrived.
    pub ttfb: std::time::Duration,
    /// Body reception.
    pub receive: std::time::Duration,
    /// Whole attempt as reported by the driver.
    pub total: std::time::Duration,
    /// Time spent following redirects.
    pub redirect: std::time::Duration,
    /// When the attempt completed.
    pub complete_at: f64,
}

/// Outcome of a transfer attempt.
///
/// A response exists for transport-level failures too: `status` stays 0 and
/// `error` carries the driver's description, so retry conditions can act on
/// either dimension.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// HTTP status code, 0 when no response was received.
    pub status: u16,
    /// Response header lines, verbatim except for status lines.
    pub headers: Vec<String>,
    /// Fully materialized response body.
    pub body: Bytes,
    /// Driver error description, empty on success.
    pub error: String,
    /// Per-attempt timing breakdown.
    pub info: TransferInfo,
}

impl Response {
    /// The status as a typed code, `None` when absent or out of range.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        if self.status == 0 {
            None
        } else {
            StatusCode::from_u16(self.status).ok()
        }
    }

    /// True for 2xx statuses.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code().is_some_and(|s| s.is_success())
    }

    /// True when the attempt failed below the HTTP layer.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        self.status == 0 && !self.error.is_empty()
    }

    /// Look up a header value by name, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (candidate, value) = line.split_once(':')?;
            if candidate.trim().eq_ignore_ascii_case(name) {
                Some(value.trim())
            } else {
                None
            }
        })
    }

    /// The body decoded as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Content-Length header value, when present and well-formed.
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length")?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Response {
        Response {
            status: 200,
            headers: vec![
                "Content-Type: text/plain".to_string(),
                "Content-Length: 5".to_string(),
            ],
            body: Bytes::from_static(b"hello"),
            error: String::new(),
            info: TransferInfo::default(),
        }
    }

    #[test]
    fn status_helpers() {
        let response = sample();
        assert!(response.is_success());
        assert_eq!(response.status_code(), Some(StatusCode::OK));
        assert!(!response.is_transport_error());
    }

    #[test]
    fn zero_status_with_error_is_a_transport_failure() {
        let response = Response {
            error: "could not connect".to_string(),
            ..Response::default()
        };
        assert!(response.is_transport_error());
        assert!(response.status_code().is_none());
        assert!(!response.is_success());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = sample();
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.header("CONTENT-LENGTH"), Some("5"));
        assert_eq!(response.header("x-missing"), None);
        assert_eq!(response.content_length(), Some(5));
    }

    #[test]
    fn body_text_decodes() {
        assert_eq!(sample().body_text(), "hello");
    }

    #[test]
    fn json_round_trips_through_the_body() {
        #[derive(serde::Deserialize)]
        struct Payload {
            ok: bool,
        }
        let response = Response {
            status: 200,
            body: Bytes::from_static(br#"{"ok":true}"#),
            ..Response::default()
        };
        let payload: Payload = response.json().expect("valid JSON body");
        assert!(payload.ok);
    }
}
