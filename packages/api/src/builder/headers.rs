//! Header chainers.

use http::{HeaderMap, HeaderName, HeaderValue};

use super::core::RequestBuilder;

impl<'a> RequestBuilder<'a> {
    /// Append one header. Invalid names or values surface as a builder
    /// error at submit time.
    #[must_use]
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        self.request = self.request.header(key, value);
        self
    }

    /// Merge a prebuilt header map.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.request = self.request.with_headers(headers);
        self
    }

    /// Shorthand for a `Content-Type` header.
    #[must_use]
    pub fn content_type(self, value: &str) -> Self {
        self.header(http::header::CONTENT_TYPE, value.to_string())
    }

    /// Shorthand for a bearer `Authorization` header.
    #[must_use]
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header(http::header::AUTHORIZATION, format!("Bearer {token}"))
    }
}
