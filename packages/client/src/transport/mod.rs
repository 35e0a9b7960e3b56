//! Transport driver seam.
//!
//! The engine delegates all HTTP framing, DNS, TLS and redirect handling to
//! libcurl through the `curl` crate's multi interface. This module wraps
//! driver handle configuration and capture (`easy`), the per-attempt
//! ingestion callbacks (`collector`), the cross-thread poll wakeup and the
//! mapping of driver terminal codes.

pub(crate) mod collector;
mod code;
pub(crate) mod easy;
pub(crate) mod waker;

pub use code::TransportCode;
