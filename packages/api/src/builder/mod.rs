//! The fluent request builder.

mod body;
mod core;
mod headers;
mod methods;

pub use self::core::RequestBuilder;
