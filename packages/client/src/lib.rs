//! # convoy-client
//!
//! Client-side HTTP engine multiplexing many concurrent transfers over a
//! shared, bounded connection pool.
//!
//! ## Features
//!
//! - **Single worker thread** driving every transfer through libcurl's
//!   multi interface, with connection reuse across requests and retries
//! - **Lifecycle control** per transfer: cancel, pause, resume, observed
//!   within one poll quantum
//! - **Pluggable retry**: condition and backoff closures over the full
//!   attempt history, with an absolute total-timeout budget
//! - **Throughput telemetry**: sliding-window mean and peak speeds per
//!   direction
//!
//! ## Usage
//!
//! ```no_run
//! use convoy_client::{HttpClient, Request, RequestPolicy, RetryPolicy};
//!
//! let client = HttpClient::new()?;
//!
//! // Blocking one-shot.
//! let response = client.await_request(
//!     Request::get("https://example.com/data"),
//!     RequestPolicy::default(),
//! )?;
//! println!("status {}", response.status);
//!
//! // Asynchronous handle with retry.
//! let handle = client.submit_with_retry(
//!     Request::get("https://example.com/flaky"),
//!     RequestPolicy::default(),
//!     RetryPolicy::default(),
//! )?;
//! let response = handle.wait()?;
//! println!("{} after {} attempts", response.status, handle.attempt_count());
//! # Ok::<(), convoy_client::Error>(())
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod hash;
pub mod http;
pub mod retry;
pub mod sync;
pub mod telemetry;
pub mod transport;

mod client;
mod util;

use std::sync::OnceLock;

pub use client::{HttpClient, ResponseFuture, TransferHandle, TransferState};
pub use config::ClientConfig;
pub use error::{Error, Kind, Result};
pub use http::{Request, RequestPolicy, Response, TransferInfo};
pub use retry::{AttemptRecord, RetryContext, RetryPolicy};
pub use telemetry::SpeedSnapshot;
pub use transport::TransportCode;

/// Process-wide default engine, built lazily with default settings and
/// torn down at process exit.
static DEFAULT_CLIENT: OnceLock<HttpClient> = OnceLock::new();

/// The shared default client.
///
/// # Panics
///
/// Panics if the engine worker thread cannot be spawned, which only
/// happens when the process is out of resources.
pub fn default_client() -> &'static HttpClient {
    DEFAULT_CLIENT
        .get_or_init(|| HttpClient::new().expect("failed to start the default engine"))
}

/// Submit on the default client. See [`HttpClient::submit`].
pub fn submit(request: Request, policy: RequestPolicy) -> Result<TransferHandle> {
    default_client().submit(request, policy)
}

/// Submit with retry on the default client. See
/// [`HttpClient::submit_with_retry`].
pub fn submit_with_retry(
    request: Request,
    policy: RequestPolicy,
    retry: RetryPolicy,
) -> Result<TransferHandle> {
    default_client().submit_with_retry(request, policy, retry)
}

/// Blocking request on the default client. See
/// [`HttpClient::await_request`].
pub fn await_request(request: Request, policy: RequestPolicy) -> Result<Response> {
    default_client().await_request(request, policy)
}

/// Blocking request with retry on the default client. See
/// [`HttpClient::await_request_with_retry`].
pub fn await_request_with_retry(
    request: Request,
    policy: RequestPolicy,
    retry: RetryPolicy,
) -> Result<Response> {
    default_client().await_request_with_retry(request, policy, retry)
}
