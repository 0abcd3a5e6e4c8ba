//! Finalized HTTP requests.
//!
//! A [`Request`] only exists at dispatch time: the fluent [`Builder`] keeps a
//! pre-dispatch description (deferred URL parse, deferred body producer) and
//! finalizes it into a `Request` when a terminal call fires.
//!
//! [`Builder`]: crate::Builder

use bytes::Bytes;
use url::Url;

use crate::{Headers, Method};

/// A finalized HTTP request handed to a [`Transport`].
///
/// The body producer has already run; headers carry both builder-set values
/// and configuration defaults, builder values winning per key.
///
/// [`Transport`]: crate::Transport
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Bytes>,
}

impl Request {
    /// Creates a finalized request.
    #[must_use]
    pub const fn new(method: Method, url: Url, headers: Headers, body: Option<Bytes>) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Single header value by name, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body, if one was produced.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Consume into `(method, url, headers, body)`.
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, Headers, Option<Bytes>) {
        (self.method, self.url, self.headers, self.body)
    }
}
