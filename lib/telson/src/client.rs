//! Transport implementation using hyper-util.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use telson_core::{BoxError, Headers, Request, Response, Transport};

use crate::config::TransportConfig;

/// Create an HTTPS connector with rustls.
///
/// Supports both HTTP/1.1 and HTTP/2, TLS via the Mozilla root certificates,
/// plus plain HTTP for local endpoints.
fn https_connector() -> HttpsConnector<HttpConnector> {
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build()
}

/// [`Transport`] backed by hyper-util with connection pooling and TLS.
///
/// Clones share the same connection pool.
///
/// # Example
///
/// ```ignore
/// use telson::{HyperTransport, TransportExt};
///
/// let transport = HyperTransport::new();
/// let body = transport
///     .build("https://api.example.com/status")
///     .string_publisher()
///     .await?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: TransportConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Create a transport with custom configuration.
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector());

        Self { inner, config }
    }

    /// The transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn to_hyper_request(request: Request) -> Result<http::Request<Full<Bytes>>, BoxError> {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        for (name, value) in &headers {
            builder = builder.header(name, value);
        }

        let body = body.map_or_else(Full::default, Full::new);
        builder.body(body).map_err(Into::into)
    }

    fn from_hyper_headers(headers: &http::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    async fn execute(&self, request: Request) -> Result<Response, BoxError> {
        let hyper_request = Self::to_hyper_request(request)?;
        tracing::debug!(uri = %hyper_request.uri(), "executing request");

        let response =
            tokio::time::timeout(self.config.timeout, self.inner.request(hyper_request))
                .await
                .map_err(|elapsed| {
                    tracing::warn!("request timed out");
                    BoxError::from(elapsed)
                })??;

        let status = response.status().as_u16();
        let headers = Self::from_hyper_headers(response.headers());

        let body = response.into_body().collect().await?.to_bytes();

        Ok(Response::new(status, headers, body))
    }
}
