//! Raw HTTP responses as yielded by transports.

use bytes::Bytes;

use crate::Headers;

/// A raw response: status, headers, and buffered body bytes.
///
/// Status acceptance and body decoding happen in the dispatch pipeline, not
/// here; a `Response` is just what the transport delivered.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub const fn new(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Single header value by name, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into `(status, body)`.
    #[must_use]
    pub fn into_status_body(self) -> (u16, Bytes) {
        (self.status, self.body)
    }
}
