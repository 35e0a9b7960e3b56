//! HTTP request model.
//!
//! A [`Request`] is plain data: method, absolute URL, headers and an
//! optional fully materialized body. Construction never fails; an invalid
//! URL is recorded inside the request and surfaced as a builder error at
//! submit time, so fluent chains stay infallible.

use std::sync::LazyLock;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// Placeholder URL installed when parsing the caller's URL fails. Never
/// reaches the driver: a request carrying a deferred error is rejected at
/// submit time.
static INVALID_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("http://invalid.localhost/").expect("placeholder URL must parse")
});

/// A logical HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    /// Deferred construction error, reported at submit time.
    error: Option<String>,
}

impl Request {
    /// Create a request from an already parsed URL.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    fn parse(method: Method, url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) => Self::new(method, parsed),
            Err(e) => {
                tracing::warn!(target: "convoy::request", url, "URL parsing failed: {e}");
                let mut request = Self::new(method, INVALID_URL.clone());
                request.error = Some(format!("invalid URL `{url}`: {e}"));
                request
            }
        }
    }

    /// Create a GET request.
    #[must_use]
    pub fn get(url: &str) -> Self {
        Self::parse(Method::GET, url)
    }

    /// Create a POST request; attach the body with [`Request::body_bytes`].
    #[must_use]
    pub fn post(url: &str) -> Self {
        Self::parse(Method::POST, url)
    }

    /// Create a HEAD request.
    #[must_use]
    pub fn head(url: &str) -> Self {
        Self::parse(Method::HEAD, url)
    }

    /// Create a PUT request.
    #[must_use]
    pub fn put(url: &str) -> Self {
        Self::parse(Method::PUT, url)
    }

    /// Create a DELETE request.
    #[must_use]
    pub fn delete(url: &str) -> Self {
        Self::parse(Method::DELETE, url)
    }

    /// Create a PATCH request.
    #[must_use]
    pub fn patch(url: &str) -> Self {
        Self::parse(Method::PATCH, url)
    }

    /// Create a request with a free-form method name.
    ///
    /// Well-known methods get their usual framing; anything else is passed
    /// through to the driver verbatim.
    #[must_use]
    pub fn with_method_name(method: &str, url: &str) -> Self {
        match Method::from_bytes(method.to_ascii_uppercase().as_bytes()) {
            Ok(method) => Self::parse(method, url),
            Err(e) => {
                let mut request = Self::parse(Method::GET, url);
                request.error = Some(format!("invalid method `{method}`: {e}"));
                request
            }
        }
    }

    // Getters

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Length of the request body, 0 when absent.
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Bytes::len)
    }

    /// True when construction recorded a deferred error.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The deferred construction error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Render headers as `name: value` lines for the driver.
    pub fn header_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.headers.iter().map(|(name, value)| {
            format!("{}: {}", name.as_str(), value.to_str().unwrap_or_default())
        })
    }

    // Chainers

    /// Add a header; invalid names or values are recorded as a deferred
    /// error rather than panicking.
    #[must_use]
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        match (key.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => {
                self.error
                    .get_or_insert_with(|| "invalid header name or value".to_string());
            }
        }
        self
    }

    /// Merge a prebuilt header map.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set the body from raw bytes.
    #[must_use]
    pub fn body_bytes<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a UTF-8 text body.
    #[must_use]
    pub fn body_text<S: Into<String>>(mut self, body: S) -> Self {
        self.body = Some(Bytes::from(body.into()));
        self
    }

    /// Serialize `value` as the JSON body and set the content type.
    #[must_use]
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.body = Some(Bytes::from(body));
                self.headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            Err(e) => {
                self.error = Some(format!("JSON serialization failed: {e}"));
            }
        }
        self
    }
}
