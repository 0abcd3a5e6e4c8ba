//! The transport capability consumed by the dispatch pipeline.
//!
//! The core never talks to the network itself: a [`Transport`] executes one
//! finalized [`Request`] and yields a raw [`Response`] or an opaque failure
//! cause. Connection pooling, retries, redirects, and caching all belong to
//! transport implementations, not here.

use std::future::Future;
use std::sync::Arc;

use crate::{BoxError, Builder, HttpConfig, Request, Response};

/// Executes finalized HTTP requests.
///
/// Implementations are cheap to clone (clone-per-dispatch is how builders
/// branch); failures are opaque causes that the pipeline wraps as
/// transport errors.
pub trait Transport: Clone + Send + Sync + 'static {
    /// Execute a request and deliver the raw response.
    ///
    /// # Errors
    ///
    /// Returns the underlying cause when the request could not be delivered:
    /// connection failures, TLS failures, timeouts, malformed responses.
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = std::result::Result<Response, BoxError>> + Send;
}

/// Entry points for starting a fluent chain from any transport.
pub trait TransportExt: Transport {
    /// Start a builder targeting `url` with process-default configuration.
    #[must_use]
    fn build(&self, url: impl AsRef<str>) -> Builder<Self> {
        Builder::new(self.clone(), url)
    }

    /// Start a builder targeting `url` with an explicit configuration.
    #[must_use]
    fn build_with_config(&self, url: impl AsRef<str>, config: Arc<HttpConfig>) -> Builder<Self> {
        Builder::with_config(self.clone(), url, config)
    }
}

impl<T: Transport> TransportExt for T {}
