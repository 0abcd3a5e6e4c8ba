//! Error types for telson.
//!
//! Every failed dispatch surfaces exactly one [`Error`], collapsing the three
//! independent failure sources of the pipeline: the transport itself, a
//! response status outside the permitted set, and the decode step. No error
//! crosses the fluent builder chain synchronously.

use bytes::Bytes;
use derive_more::Display;

/// Boxed error cause passed through from transports and decoders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for a dispatched request.
///
/// Exactly one variant is active per failed call. Status check happens before
/// decoding, so a non-permitted status is always reported as [`Error::Status`]
/// even when the body would have decoded cleanly.
#[derive(Debug, Display)]
pub enum Error {
    /// The transport failed to deliver a response. The cause is opaque and
    /// passed through from the transport implementation.
    #[display("transport error: {source}")]
    Transport {
        /// Underlying transport failure.
        source: BoxError,
        /// Response payload, when the transport salvaged one.
        body: Option<Bytes>,
    },

    /// A response arrived, but its status code is not in the permitted set.
    /// The raw body is retained so callers can inspect error payloads.
    #[display("unacceptable status code: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: Bytes,
    },

    /// The response body failed to decode into the target type. The cause is
    /// absent for pure format mismatches (e.g. bytes invalid under the
    /// requested text encoding) and present when a decoder failed.
    #[display("decode error: {}", source.as_ref().map_or_else(|| String::from("malformed payload"), ToString::to_string))]
    Decode {
        /// Underlying decode failure, when one was raised.
        source: Option<BoxError>,
    },
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(&**source),
            Self::Decode { source } => source.as_deref().map(|cause| cause as _),
            Self::Status { .. } => None,
        }
    }
}

impl Error {
    /// Create a transport error from an opaque cause.
    #[must_use]
    pub fn transport(source: impl Into<BoxError>) -> Self {
        Self::Transport {
            source: source.into(),
            body: None,
        }
    }

    /// Create a transport error that salvaged a partial response payload.
    #[must_use]
    pub fn transport_with_body(source: impl Into<BoxError>, body: Bytes) -> Self {
        Self::Transport {
            source: source.into(),
            body: Some(body),
        }
    }

    /// Create a status error from a non-permitted status code and raw body.
    #[must_use]
    pub const fn status(status: u16, body: Bytes) -> Self {
        Self::Status { status, body }
    }

    /// Create a decode error from a raised cause.
    #[must_use]
    pub fn decode(source: impl Into<BoxError>) -> Self {
        Self::Decode {
            source: Some(source.into()),
        }
    }

    /// Create a decode error for a pure format mismatch, with no cause.
    #[must_use]
    pub const fn decode_mismatch() -> Self {
        Self::Decode { source: None }
    }

    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns `true` if this is a status error.
    #[must_use]
    pub const fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// Returns `true` if this is a decode error.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns the status code if this is a status error.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the retained response body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Status { body, .. } => Some(body),
            Self::Transport { body, .. } => body.as_ref(),
            Self::Decode { .. } => None,
        }
    }

    /// Try to decode the retained error body as JSON.
    ///
    /// Returns `None` when no body was retained, `Some(Err(_))` when a body
    /// exists but does not deserialize into `T`.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::status(404, Bytes::from_static(b"gone"));
        assert_eq!(err.to_string(), "unacceptable status code: 404");

        let err = Error::transport(std::io::Error::other("connection reset"));
        assert_eq!(err.to_string(), "transport error: connection reset");

        let err = Error::decode_mismatch();
        assert_eq!(err.to_string(), "decode error: malformed payload");
    }

    #[test]
    fn decode_error_shows_cause() {
        let err = Error::decode(std::io::Error::other("bad field"));
        assert_eq!(err.to_string(), "decode error: bad field");
    }

    #[test]
    fn error_predicates() {
        assert!(Error::transport(std::io::Error::other("x")).is_transport());
        assert!(Error::status(500, Bytes::new()).is_status());
        assert!(Error::decode_mismatch().is_decode());
        assert!(!Error::decode_mismatch().is_status());
    }

    #[test]
    fn status_code_accessor() {
        assert_eq!(Error::status(503, Bytes::new()).status_code(), Some(503));
        assert_eq!(Error::decode_mismatch().status_code(), None);
    }

    #[test]
    fn error_source_chain() {
        use std::error::Error as _;

        let err = Error::decode(std::io::Error::other("cause"));
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("cause"));

        assert!(Error::decode_mismatch().source().is_none());
        assert!(Error::status(500, Bytes::new()).source().is_none());
    }

    #[test]
    fn body_retained_for_inspection() {
        let payload = Bytes::from_static(br#"{"error":"nope"}"#);
        let err = Error::status(422, payload.clone());
        assert_eq!(err.body(), Some(&payload));

        let err = Error::transport_with_body(std::io::Error::other("cut off"), payload.clone());
        assert_eq!(err.body(), Some(&payload));

        assert!(Error::decode_mismatch().body().is_none());
    }

    #[test]
    fn decode_body_as_json() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct ApiError {
            error: String,
        }

        let err = Error::status(404, Bytes::from_static(br#"{"error":"not found"}"#));
        let decoded: ApiError = err
            .decode_body()
            .expect("body retained")
            .expect("valid json");
        assert_eq!(
            decoded,
            ApiError {
                error: "not found".to_string()
            }
        );

        let err = Error::status(404, Bytes::from_static(b"plain text"));
        assert!(err.decode_body::<ApiError>().expect("body retained").is_err());
    }
}
