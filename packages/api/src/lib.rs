//! # convoy
//!
//! Fluent request-building facade over the `convoy-client` transfer
//! engine. Chains start from a method constructor, configure the request
//! and its policies, and end in [`RequestBuilder::send`] (asynchronous
//! handle) or [`RequestBuilder::fetch`] (blocking response).
//!
//! ```no_run
//! use convoy::RetryPolicy;
//!
//! let response = convoy::get("https://example.com/data")
//!     .header("accept", "application/json")
//!     .timeout(std::time::Duration::from_secs(10))
//!     .retry(RetryPolicy::default().with_max_retries(2))
//!     .fetch()?;
//! println!("{}", response.status);
//! # Ok::<(), convoy::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod builder;

pub use builder::RequestBuilder;

// Re-export the engine surface so most callers need a single dependency.
pub use convoy_client::{
    default_client, hash, retry, ClientConfig, Error, HttpClient, Kind, Request, RequestPolicy,
    Response, ResponseFuture, Result, RetryContext, RetryPolicy, SpeedSnapshot, TransferHandle,
    TransferInfo, TransferState, TransportCode,
};

/// Start a GET request.
#[must_use]
pub fn get(url: &str) -> RequestBuilder<'static> {
    RequestBuilder::new(Request::get(url))
}

/// Start a POST request.
#[must_use]
pub fn post(url: &str) -> RequestBuilder<'static> {
    RequestBuilder::new(Request::post(url))
}

/// Start a HEAD request.
#[must_use]
pub fn head(url: &str) -> RequestBuilder<'static> {
    RequestBuilder::new(Request::head(url))
}

/// Start a PUT request.
#[must_use]
pub fn put(url: &str) -> RequestBuilder<'static> {
    RequestBuilder::new(Request::put(url))
}

/// Start a DELETE request.
#[must_use]
pub fn delete(url: &str) -> RequestBuilder<'static> {
    RequestBuilder::new(Request::delete(url))
}

/// Start a PATCH request.
#[must_use]
pub fn patch(url: &str) -> RequestBuilder<'static> {
    RequestBuilder::new(Request::patch(url))
}

/// Start a request with a free-form method name.
#[must_use]
pub fn method(name: &str, url: &str) -> RequestBuilder<'static> {
    RequestBuilder::new(Request::with_method_name(name, url))
}
