//! Body chainers.

use bytes::Bytes;

use super::core::RequestBuilder;

impl<'a> RequestBuilder<'a> {
    /// Use raw bytes as the request body.
    #[must_use]
    pub fn body_bytes<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.request = self.request.body_bytes(body);
        self
    }

    /// Use UTF-8 text as the request body.
    #[must_use]
    pub fn body_text<S: Into<String>>(mut self, body: S) -> Self {
        self.request = self.request.body_text(body);
        self
    }

    /// Serialize `value` as a JSON body and set the content type.
    #[must_use]
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.request = self.request.json(value);
        self
    }
}
