//! Semantic terminal codes reported by the transport driver.

/// How a transfer attempt ended at the transport layer.
///
/// `Ok` means an HTTP response was received, whatever its status. The named
/// failure variants cover the transient network errors the default retry
/// condition acts on; anything else is carried as `Other` with the driver's
/// raw code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportCode {
    /// An HTTP response was received.
    #[default]
    Ok,
    /// Host name resolution failed.
    ResolveHost,
    /// The connection could not be established.
    Connect,
    /// The attempt ran into a driver-enforced timeout.
    Timeout,
    /// The TLS handshake failed.
    TlsHandshake,
    /// Sending request data failed.
    SendFailed,
    /// Receiving response data failed.
    RecvFailed,
    /// The server closed the connection without a response.
    EmptyResponse,
    /// Any other driver error, with the raw driver code.
    Other(u32),
}

impl TransportCode {
    pub(crate) fn from_driver(error: &curl::Error) -> Self {
        if error.is_couldnt_resolve_host() {
            TransportCode::ResolveHost
        } else if error.is_couldnt_connect() {
            TransportCode::Connect
        } else if error.is_operation_timedout() {
            TransportCode::Timeout
        } else if error.is_ssl_connect_error() {
            TransportCode::TlsHandshake
        } else if error.is_send_error() {
            TransportCode::SendFailed
        } else if error.is_recv_error() {
            TransportCode::RecvFailed
        } else if error.is_got_nothing() {
            TransportCode::EmptyResponse
        } else {
            let raw = error.code() as u32;
            TransportCode::Other(raw)
        }
    }

    /// True when an HTTP response was received.
    #[inline]
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, TransportCode::Ok)
    }

    /// True for the transient network failures worth re-attempting:
    /// resolution, connect, driver timeout, TLS handshake, send, receive
    /// and empty-response errors.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            TransportCode::ResolveHost
                | TransportCode::Connect
                | TransportCode::Timeout
                | TransportCode::TlsHandshake
                | TransportCode::SendFailed
                | TransportCode::RecvFailed
                | TransportCode::EmptyResponse
        )
    }
}
