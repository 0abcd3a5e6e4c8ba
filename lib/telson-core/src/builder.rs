//! Fluent request building and dispatch.
//!
//! A [`Builder`] accumulates a request description by value: every fluent
//! method consumes the builder and returns it with exactly one aspect
//! changed. Nothing runs and nothing fails until a terminal call: URL parse
//! errors, body serialization, transport and decode failures all surface at
//! dispatch, through the one error taxonomy.
//!
//! Terminal calls come in two shapes over one pipeline: the `*publisher`
//! family returns a cancellable [`Publisher`] future, and the `receive*`
//! family spawns that same future on a [`Queue`] and hands the outcome to a
//! callback.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use url::Url;

use crate::decode::{Decoder, TextEncoding};
use crate::publisher::{PipelineFuture, Publisher, Receipt};
use crate::{
    BoxError, ContentType, Error, Form, Headers, HttpConfig, Method, Queue, Request, Result,
    Transport,
};

type BodyProducer = Arc<dyn Fn() -> Result<Bytes> + Send + Sync>;

/// Request URL, parse deferred to dispatch so the fluent chain stays
/// infallible.
#[derive(Debug, Clone)]
enum UrlTarget {
    Valid(Url),
    Invalid(String, url::ParseError),
}

/// Fluent HTTP request builder over a [`Transport`].
///
/// Builders have value semantics: cloning one and continuing both chains
/// never shares mutable state, and a retained pre-dispatch builder can issue
/// several independent requests (the body producer re-runs per dispatch).
///
/// # Example
///
/// ```ignore
/// let widget: Widget = transport
///     .build("https://api.example.com/widgets")
///     .header("X-Trace", "1")
///     .publisher_decoding()
///     .await?;
/// ```
pub struct Builder<T: Transport> {
    transport: T,
    config: Arc<HttpConfig>,
    method: Method,
    url: UrlTarget,
    headers: Headers,
    body: Option<BodyProducer>,
    permitted: Option<HashSet<u16>>,
}

impl<T: Transport> Clone for Builder<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: Arc::clone(&self.config),
            method: self.method,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            permitted: self.permitted.clone(),
        }
    }
}

impl<T: Transport> std::fmt::Debug for Builder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Builder<T> {
    /// Builder targeting `url` with process-default configuration.
    #[must_use]
    pub fn new(transport: T, url: impl AsRef<str>) -> Self {
        Self::with_config(transport, url, HttpConfig::shared())
    }

    /// Builder targeting `url` with an explicit configuration.
    #[must_use]
    pub fn with_config(transport: T, url: impl AsRef<str>, config: Arc<HttpConfig>) -> Self {
        let raw = url.as_ref();
        let url = match Url::parse(raw) {
            Ok(url) => UrlTarget::Valid(url),
            Err(cause) => UrlTarget::Invalid(raw.to_string(), cause),
        };
        Self {
            transport,
            config,
            method: Method::default(),
            url,
            headers: Headers::new(),
            body: None,
            permitted: None,
        }
    }

    // ========================================================================
    // Fluent methods
    // ========================================================================

    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set a header; names match case-insensitively, last write wins.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Set the `Content-Type` header.
    #[must_use]
    pub fn content_type(self, content_type: ContentType) -> Self {
        self.header("Content-Type", content_type.as_str())
    }

    /// Set the `Accept` header.
    #[must_use]
    pub fn accept(self, content_type: ContentType) -> Self {
        self.header("Accept", content_type.as_str())
    }

    /// Append a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        if let UrlTarget::Valid(url) = &mut self.url {
            url.query_pairs_mut().append_pair(name, value);
        }
        self
    }

    /// Override the permitted status codes for this request only.
    #[must_use]
    pub fn permit_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.permitted = Some(statuses.into_iter().collect());
        self
    }

    /// Set a deferred body producer, run exactly once per dispatch. A raised
    /// failure surfaces as a decode-stage error.
    #[must_use]
    pub fn body<F>(self, produce: F) -> Self
    where
        F: Fn() -> std::result::Result<Bytes, BoxError> + Send + Sync + 'static,
    {
        self.body_producer(move || produce().map_err(Error::decode))
    }

    /// Set a constant body.
    #[must_use]
    pub fn body_bytes(self, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        self.body_producer(move || Ok(data.clone()))
    }

    fn body_producer<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Result<Bytes> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(produce));
        self
    }

    // ========================================================================
    // POST variants
    // ========================================================================

    /// POST with a constant body.
    #[must_use]
    pub fn post_data(self, data: impl Into<Bytes>) -> Self {
        self.method(Method::Post).body_bytes(data)
    }

    /// POST `value` as JSON. Serialization happens when the request fires,
    /// not here; a failure surfaces as a decode-stage error at dispatch.
    #[must_use]
    pub fn post_json<B>(self, value: B) -> Self
    where
        B: serde::Serialize + Send + Sync + 'static,
    {
        self.content_type(ContentType::Json)
            .method(Method::Post)
            .body_producer(move || crate::to_json(&value))
    }

    /// POST `value` form URL-encoded, serialized at dispatch.
    #[must_use]
    pub fn post_form<B>(self, value: B) -> Self
    where
        B: serde::Serialize + Send + Sync + 'static,
    {
        self.content_type(ContentType::FormUrlEncoded)
            .method(Method::Post)
            .body_producer(move || crate::to_form(&value))
    }

    /// POST a multipart form; content type and encoding both come from the
    /// form itself.
    #[must_use]
    pub fn post_multipart(self, form: Form) -> Self {
        let (content_type, body) = form.into_body();
        self.header("Content-Type", content_type)
            .method(Method::Post)
            .body_bytes(body)
    }

    // ========================================================================
    // Dispatch pipeline
    // ========================================================================

    /// Finalize and execute: merge defaults, run the body producer once,
    /// execute the transport, then gate on the permitted status set. Raw
    /// bytes come out; decoding happens per terminal call on top of this.
    fn raw_future(&self, hint: Option<ContentType>) -> PipelineFuture<Bytes> {
        let transport = self.transport.clone();
        let config = Arc::clone(&self.config);
        let method = self.method;
        let target = self.url.clone();
        let mut headers = self.headers.clone();
        let produce = self.body.clone();
        let permitted = self.permitted.clone();

        Box::pin(async move {
            let url = match target {
                UrlTarget::Valid(url) => url,
                UrlTarget::Invalid(raw, cause) => {
                    tracing::warn!(url = %raw, "invalid request URL");
                    return Err(Error::transport(cause));
                }
            };

            // Builder-set headers win over the decode hint, which wins over
            // configuration defaults.
            if let Some(hint) = hint {
                headers.set_if_absent("Accept", hint.as_str());
            }
            for (name, value) in config.default_headers() {
                headers.set_if_absent(name, value);
            }

            let body = match &produce {
                Some(produce) => Some(produce()?),
                None => None,
            };

            let request = Request::new(method, url, headers, body);
            tracing::debug!(method = %request.method(), url = %request.url(), "dispatching request");

            let response = match transport.execute(request).await {
                Ok(response) => response,
                Err(cause) => {
                    tracing::warn!(error = %cause, "transport failure");
                    return Err(Error::Transport {
                        source: cause,
                        body: None,
                    });
                }
            };

            let (status, bytes) = response.into_status_body();
            let accepted = permitted
                .as_ref()
                .map_or_else(|| config.permits(status), |set| set.contains(&status));
            if !accepted {
                tracing::warn!(status, "unacceptable status code");
                return Err(Error::status(status, bytes));
            }

            Ok(bytes)
        })
    }

    // ========================================================================
    // Terminal calls: publisher surface
    // ========================================================================

    /// Dispatch and yield the raw response bytes.
    #[must_use]
    pub fn publisher(&self) -> Publisher<Bytes> {
        self.publisher_with(Decoder::raw())
    }

    /// Dispatch and decode the body as UTF-8 text.
    #[must_use]
    pub fn string_publisher(&self) -> Publisher<String> {
        self.string_publisher_with(TextEncoding::default())
    }

    /// Dispatch and decode the body under `encoding`; a mismatch is a decode
    /// error with no cause.
    #[must_use]
    pub fn string_publisher_with(&self, encoding: TextEncoding) -> Publisher<String> {
        self.publisher_with(Decoder::text(encoding))
    }

    /// Dispatch and decode the body as JSON into `R`, setting
    /// `Accept: application/json` unless the chain already chose one.
    #[must_use]
    pub fn publisher_decoding<R>(&self) -> Publisher<R>
    where
        R: serde::de::DeserializeOwned + Send + 'static,
    {
        self.publisher_with(Decoder::json())
    }

    /// Dispatch and decode with an explicit decoder; its content-type hint,
    /// if any, drives the `Accept` header.
    #[must_use]
    pub fn publisher_with<R>(&self, decoder: Decoder<R>) -> Publisher<R>
    where
        R: Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let raw = self.raw_future(decoder.content_hint());
        let flag = Arc::clone(&cancelled);
        let future: PipelineFuture<R> = Box::pin(async move {
            let bytes = raw.await?;
            // Cancellation gate: once cancelled, nothing may be delivered and
            // the decoder must not run.
            if flag.load(Ordering::Acquire) {
                std::future::pending::<()>().await;
            }
            decoder.decode(&bytes)
        });
        Publisher::new(future, cancelled)
    }

    /// Dispatch and decode through the decoder registered for `R` in the
    /// configuration. An absent registration fails with a decode error
    /// before any transport call.
    #[must_use]
    pub fn registered_publisher<R>(&self) -> Publisher<R>
    where
        R: Send + 'static,
    {
        match self.config.decoder::<R>() {
            Some(decoder) => self.publisher_with(decoder),
            None => Publisher::failed(Error::decode_mismatch()),
        }
    }

    // ========================================================================
    // Terminal calls: callback surface
    // ========================================================================

    /// Dispatch and deliver the raw bytes to `callback` on `queue` (config
    /// default, then current runtime, when `None`).
    pub fn receive<F>(&self, queue: impl Into<Option<Queue>>, callback: F) -> Receipt
    where
        F: FnOnce(Result<Bytes>) + Send + 'static,
    {
        self.receive_with(Decoder::raw(), queue, callback)
    }

    /// Dispatch and deliver the body decoded under `encoding`.
    pub fn receive_string<F>(
        &self,
        encoding: TextEncoding,
        queue: impl Into<Option<Queue>>,
        callback: F,
    ) -> Receipt
    where
        F: FnOnce(Result<String>) + Send + 'static,
    {
        self.receive_with(Decoder::text(encoding), queue, callback)
    }

    /// Dispatch and deliver the body decoded as JSON into `R`.
    pub fn receive_decoding<R, F>(&self, queue: impl Into<Option<Queue>>, callback: F) -> Receipt
    where
        R: serde::de::DeserializeOwned + Send + 'static,
        F: FnOnce(Result<R>) + Send + 'static,
    {
        self.receive_with(Decoder::json(), queue, callback)
    }

    /// Dispatch and deliver through an explicit decoder. The callback fires
    /// exactly once, or never if the receipt is cancelled first.
    pub fn receive_with<R, F>(
        &self,
        decoder: Decoder<R>,
        queue: impl Into<Option<Queue>>,
        callback: F,
    ) -> Receipt
    where
        R: Send + 'static,
        F: FnOnce(Result<R>) + Send + 'static,
    {
        let publisher = self.publisher_with(decoder);
        let cancelled = publisher.cancel_flag();
        let queue = queue
            .into()
            .or_else(|| self.config.default_queue().cloned())
            .unwrap_or_else(Queue::current);

        let flag = Arc::clone(&cancelled);
        let task = queue.spawn(async move {
            let result = publisher.await;
            if !flag.load(Ordering::Acquire) {
                callback(result);
            }
        });
        Receipt::new(cancelled, task)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::{Response, TransportExt};

    /// Transport stub delivering a fixed status and body, recording calls
    /// and the last finalized request.
    #[derive(Clone)]
    struct StubTransport {
        status: u16,
        body: Bytes,
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Option<Request>>>,
    }

    impl StubTransport {
        fn respond(status: u16, body: &'static [u8]) -> Self {
            Self {
                status,
                body: Bytes::from_static(body),
                calls: Arc::new(AtomicUsize::new(0)),
                seen: Arc::new(Mutex::new(None)),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> Request {
            self.seen
                .lock()
                .expect("lock")
                .clone()
                .expect("a request was dispatched")
        }
    }

    impl Transport for StubTransport {
        async fn execute(&self, request: Request) -> std::result::Result<Response, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().expect("lock") = Some(request);
            Ok(Response::new(self.status, Headers::new(), self.body.clone()))
        }
    }

    /// Transport stub failing with an opaque cause.
    #[derive(Clone)]
    struct FailingTransport;

    impl Transport for FailingTransport {
        async fn execute(&self, _request: Request) -> std::result::Result<Response, BoxError> {
            Err(std::io::Error::other("connection refused").into())
        }
    }

    /// Transport stub that delivers only once the gate opens.
    #[derive(Clone)]
    struct GatedTransport {
        gate: Arc<tokio::sync::Notify>,
        body: Bytes,
    }

    impl GatedTransport {
        fn new() -> Self {
            Self {
                gate: Arc::new(tokio::sync::Notify::new()),
                body: Bytes::from_static(b"late"),
            }
        }
    }

    impl Transport for GatedTransport {
        async fn execute(&self, _request: Request) -> std::result::Result<Response, BoxError> {
            self.gate.notified().await;
            Ok(Response::new(200, Headers::new(), self.body.clone()))
        }
    }

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Widget {
        id: u64,
    }

    fn spy_decoder(calls: &Arc<AtomicUsize>) -> Decoder<Bytes> {
        let calls = Arc::clone(calls);
        Decoder::new(move |bytes: &Bytes| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(bytes.clone())
        })
    }

    // ------------------------------------------------------------------------
    // Descriptor accumulation
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn header_set_twice_keeps_last_value() {
        let transport = StubTransport::respond(200, b"");
        transport
            .build("https://api.example.test/x")
            .header("X-Token", "first")
            .header("x-token", "second")
            .publisher()
            .await
            .expect("success");

        let request = transport.last_request();
        assert_eq!(request.header("X-TOKEN"), Some("second"));
        assert_eq!(request.headers().len(), 1);
    }

    #[tokio::test]
    async fn builder_accumulates_method_query_and_body() {
        let transport = StubTransport::respond(200, b"");
        transport
            .build("https://api.example.test/items")
            .method(Method::Put)
            .query("page", "2")
            .body_bytes(&b"payload"[..])
            .publisher()
            .await
            .expect("success");

        let request = transport.last_request();
        assert_eq!(request.method(), Method::Put);
        assert_eq!(request.url().as_str(), "https://api.example.test/items?page=2");
        assert_eq!(request.body().map(Bytes::as_ref), Some(&b"payload"[..]));
    }

    #[tokio::test]
    async fn branched_builders_do_not_share_state() {
        let transport = StubTransport::respond(200, b"");
        let base = transport
            .build("https://api.example.test/x")
            .header("Shared", "yes");

        let left = base.clone().header("Left", "1");
        let right = base.header("Right", "2");

        left.publisher().await.expect("left");
        let request = transport.last_request();
        assert_eq!(request.header("Left"), Some("1"));
        assert_eq!(request.header("Right"), None);

        right.publisher().await.expect("right");
        let request = transport.last_request();
        assert_eq!(request.header("Right"), Some("2"));
        assert_eq!(request.header("Left"), None);
    }

    #[tokio::test]
    async fn post_json_sets_method_content_type_and_body() {
        #[derive(serde::Serialize)]
        struct NewUser {
            name: &'static str,
        }

        let transport = StubTransport::respond(200, b"");
        transport
            .build("https://api.example.test/users")
            .post_json(NewUser { name: "Ada" })
            .publisher()
            .await
            .expect("success");

        let request = transport.last_request();
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.body().map(Bytes::as_ref), Some(&br#"{"name":"Ada"}"#[..]));
    }

    #[tokio::test]
    async fn post_form_uses_urlencoded_content_type() {
        #[derive(serde::Serialize)]
        struct Login {
            user: &'static str,
        }

        let transport = StubTransport::respond(200, b"");
        transport
            .build("https://api.example.test/login")
            .post_form(Login { user: "ada" })
            .publisher()
            .await
            .expect("success");

        let request = transport.last_request();
        assert_eq!(
            request.header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.body().map(Bytes::as_ref), Some(&b"user=ada"[..]));
    }

    #[tokio::test]
    async fn post_multipart_takes_type_and_body_from_form() {
        let transport = StubTransport::respond(200, b"");
        let form = Form::with_boundary("bnd").text("field", "value");

        transport
            .build("https://api.example.test/upload")
            .post_multipart(form)
            .publisher()
            .await
            .expect("success");

        let request = transport.last_request();
        assert_eq!(
            request.header("Content-Type"),
            Some("multipart/form-data; boundary=bnd")
        );
        assert_eq!(request.method(), Method::Post);
    }

    // ------------------------------------------------------------------------
    // Deferred work
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn body_producer_runs_once_per_dispatch_at_dispatch_time() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);

        let transport = StubTransport::respond(200, b"");
        let builder = transport
            .build("https://api.example.test/x")
            .body(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from_static(b"data"))
            });

        // Building the chain ran nothing.
        assert_eq!(produced.load(Ordering::SeqCst), 0);

        builder.publisher().await.expect("first dispatch");
        assert_eq!(produced.load(Ordering::SeqCst), 1);

        // A retained builder re-evaluates the producer per dispatch.
        builder.publisher().await.expect("second dispatch");
        assert_eq!(produced.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn post_json_serializes_at_dispatch_time() {
        struct Observed {
            serialized: Arc<AtomicUsize>,
        }

        impl serde::Serialize for Observed {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                self.serialized.fetch_add(1, Ordering::SeqCst);
                serializer.serialize_u64(7)
            }
        }

        let serialized = Arc::new(AtomicUsize::new(0));
        let transport = StubTransport::respond(200, b"");
        let builder = transport.build("https://api.example.test/x").post_json(Observed {
            serialized: Arc::clone(&serialized),
        });

        assert_eq!(serialized.load(Ordering::SeqCst), 0, "no eager serialization");

        builder.publisher().await.expect("dispatch");
        assert_eq!(serialized.load(Ordering::SeqCst), 1);

        builder.publisher().await.expect("re-dispatch");
        assert_eq!(serialized.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_body_producer_is_a_decode_error_and_skips_transport() {
        let transport = StubTransport::respond(200, b"");
        let err = transport
            .build("https://api.example.test/x")
            .body(|| Err("encoder broke".into()))
            .publisher()
            .await
            .expect_err("producer failure");

        assert!(matches!(err, Error::Decode { source: Some(_) }));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn invalid_url_surfaces_as_transport_error_at_dispatch() {
        let transport = StubTransport::respond(200, b"");
        let err = transport
            .build("not a url")
            .publisher()
            .await
            .expect_err("invalid URL");

        assert!(err.is_transport());
        assert_eq!(transport.call_count(), 0);
    }

    // ------------------------------------------------------------------------
    // Error mapping order
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn transport_failure_wraps_cause() {
        let err = FailingTransport
            .build("https://api.example.test/x")
            .publisher()
            .await
            .expect_err("transport failure");

        assert!(err.is_transport());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[tokio::test]
    async fn unacceptable_status_wins_over_decodable_body() {
        // The body decodes cleanly into Widget, but 500 must be reported as a
        // status error, never smuggled into the decode stage.
        let transport = StubTransport::respond(500, br#"{"id":1}"#);
        let err = transport
            .build("https://api.example.test/x")
            .publisher_decoding::<Widget>()
            .await
            .expect_err("status failure");

        assert_eq!(err.status_code(), Some(500));
        assert_eq!(
            err.body().map(Bytes::as_ref),
            Some(&br#"{"id":1}"#[..]),
            "raw bytes retained for inspection"
        );
    }

    #[tokio::test]
    async fn permit_statuses_overrides_config_default() {
        let transport = StubTransport::respond(404, b"absent");
        let builder = transport
            .build("https://api.example.test/x")
            .permit_statuses([200, 404]);

        builder.publisher().await.expect("404 permitted here");

        let err = transport
            .build("https://api.example.test/x")
            .publisher()
            .await
            .expect_err("404 not permitted by default");
        assert_eq!(err.status_code(), Some(404));
    }

    // ------------------------------------------------------------------------
    // Decoding
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn string_publisher_rejects_invalid_utf8_without_cause() {
        let transport = StubTransport::respond(200, &[0xFF, 0xFE, 0x00]);
        let err = transport
            .build("https://api.example.test/x")
            .string_publisher()
            .await
            .expect_err("invalid utf-8");

        assert!(matches!(err, Error::Decode { source: None }));
    }

    #[tokio::test]
    async fn string_publisher_with_encoding_decodes_utf16() {
        let transport = StubTransport::respond(200, &[0x68, 0x00, 0x69, 0x00]);
        let text = transport
            .build("https://api.example.test/x")
            .string_publisher_with(TextEncoding::Utf16Le)
            .await
            .expect("utf-16le");

        assert_eq!(text, "hi");
    }

    #[tokio::test]
    async fn throwing_decoder_keeps_its_cause() {
        let transport = StubTransport::respond(200, b"payload");
        let decoder: Decoder<u64> = Decoder::new(|_| Err("boom".to_string().into()));

        let err = transport
            .build("https://api.example.test/x")
            .publisher_with(decoder)
            .await
            .expect_err("decoder raised");

        assert!(matches!(err, Error::Decode { source: Some(_) }));
        assert_eq!(err.to_string(), "decode error: boom");
    }

    #[tokio::test]
    async fn json_decoding_sets_accept_header() {
        let transport = StubTransport::respond(200, br#"{"id":1}"#);
        transport
            .build("https://api.example.test/x")
            .publisher_decoding::<Widget>()
            .await
            .expect("success");

        let request = transport.last_request();
        assert_eq!(request.header("Accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn explicit_accept_wins_over_decoder_hint() {
        let transport = StubTransport::respond(200, br#"{"id":1}"#);
        transport
            .build("https://api.example.test/x")
            .accept(ContentType::PlainText)
            .publisher_decoding::<Widget>()
            .await
            .expect("success");

        let request = transport.last_request();
        assert_eq!(request.header("Accept"), Some("text/plain"));
    }

    #[tokio::test]
    async fn config_default_headers_merge_under_builder_headers() {
        let config = HttpConfig::builder()
            .default_header("User-Agent", "telson")
            .default_header("X-Env", "default")
            .build_shared();

        let transport = StubTransport::respond(200, b"");
        transport
            .build_with_config("https://api.example.test/x", config)
            .header("X-Env", "override")
            .publisher()
            .await
            .expect("success");

        let request = transport.last_request();
        assert_eq!(request.header("User-Agent"), Some("telson"));
        assert_eq!(request.header("X-Env"), Some("override"));
    }

    #[tokio::test]
    async fn registered_publisher_uses_config_registry() {
        // String is pre-registered (UTF-8) in the default configuration.
        let transport = StubTransport::respond(200, b"plain text");
        let text = transport
            .build("https://api.example.test/x")
            .registered_publisher::<String>()
            .await
            .expect("registered decoder");
        assert_eq!(text, "plain text");
    }

    #[tokio::test]
    async fn registered_publisher_fails_without_registration() {
        let transport = StubTransport::respond(200, br#"{"id":1}"#);
        let err = transport
            .build("https://api.example.test/x")
            .registered_publisher::<Widget>()
            .await
            .expect_err("no decoder registered");

        assert!(matches!(err, Error::Decode { source: None }));
        assert_eq!(transport.call_count(), 0, "failed before any transport call");
    }

    // ------------------------------------------------------------------------
    // End to end
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn end_to_end_success_status_and_decode_failures() {
        let ok = StubTransport::respond(200, br#"{"id":1}"#);
        let widget: Widget = ok
            .build("https://example.test/x")
            .publisher_decoding()
            .await
            .expect("decoded widget");
        assert_eq!(widget, Widget { id: 1 });

        let server_error = StubTransport::respond(500, br#"{"id":1}"#);
        let err = server_error
            .build("https://example.test/x")
            .publisher_decoding::<Widget>()
            .await
            .expect_err("status error");
        assert_eq!(err.status_code(), Some(500));

        let garbage = StubTransport::respond(200, b"not json");
        let err = garbage
            .build("https://example.test/x")
            .publisher_decoding::<Widget>()
            .await
            .expect_err("decode error");
        assert!(matches!(err, Error::Decode { source: Some(_) }));
    }

    // ------------------------------------------------------------------------
    // Callback surface
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn receive_delivers_exactly_once() {
        let transport = StubTransport::respond(200, b"bytes");
        let delivered = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&delivered);
        let (tx, rx) = tokio::sync::oneshot::channel();

        transport
            .build("https://api.example.test/x")
            .receive(None, move |result| {
                count.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(result);
            });

        let result = rx.await.expect("callback fired");
        assert_eq!(result.expect("success").as_ref(), b"bytes");
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn receive_decoding_delivers_typed_value() {
        let transport = StubTransport::respond(200, br#"{"id":9}"#);
        let (tx, rx) = tokio::sync::oneshot::channel();

        transport
            .build("https://api.example.test/x")
            .receive_decoding::<Widget, _>(None, move |result| {
                let _ = tx.send(result);
            });

        let widget = rx.await.expect("callback fired").expect("decoded");
        assert_eq!(widget, Widget { id: 9 });
    }

    #[tokio::test]
    async fn receive_string_reports_mismatch() {
        let transport = StubTransport::respond(200, &[0xFF]);
        let (tx, rx) = tokio::sync::oneshot::channel();

        transport
            .build("https://api.example.test/x")
            .receive_string(TextEncoding::Utf8, None, move |result| {
                let _ = tx.send(result);
            });

        let err = rx.await.expect("callback fired").expect_err("mismatch");
        assert!(matches!(err, Error::Decode { source: None }));
    }

    // ------------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn cancelled_receipt_never_reaches_decoder_or_callback() {
        let transport = GatedTransport::new();
        let decoder_calls = Arc::new(AtomicUsize::new(0));
        let callback_calls = Arc::new(AtomicUsize::new(0));

        let callbacks = Arc::clone(&callback_calls);
        let receipt = transport
            .build("https://api.example.test/x")
            .receive_with(spy_decoder(&decoder_calls), None, move |_| {
                callbacks.fetch_add(1, Ordering::SeqCst);
            });

        receipt.cancel();
        assert!(receipt.is_cancelled());

        // Let the transport deliver after cancellation and give the spawned
        // task every chance to (incorrectly) proceed.
        transport.gate.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(decoder_calls.load(Ordering::SeqCst), 0);
        assert_eq!(callback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_publisher_never_reaches_decoder() {
        let transport = GatedTransport::new();
        let decoder_calls = Arc::new(AtomicUsize::new(0));

        let publisher = transport
            .build("https://api.example.test/x")
            .publisher_with(spy_decoder(&decoder_calls));
        let handle = publisher.cancel_handle();

        handle.cancel();
        transport.gate.notify_one();

        let outcome = tokio::time::timeout(Duration::from_millis(20), publisher).await;
        assert!(outcome.is_err(), "cancelled publisher must not deliver");
        assert_eq!(decoder_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn uncancelled_receipt_still_delivers() {
        let transport = GatedTransport::new();
        let (tx, rx) = tokio::sync::oneshot::channel();

        let receipt = transport
            .build("https://api.example.test/x")
            .receive(None, move |result| {
                let _ = tx.send(result);
            });

        transport.gate.notify_one();
        let result = rx.await.expect("callback fired");
        assert_eq!(result.expect("success").as_ref(), b"late");
        assert!(!receipt.is_cancelled());
    }
}
