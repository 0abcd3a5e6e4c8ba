//! Body serialization helpers.
//!
//! Everything here feeds the deferred body producers of the builder: values
//! are serialized when the request fires, not when the fluent call was made.

use bytes::Bytes;

use crate::{Error, Result};

/// Content type for request bodies and decode hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns a decode-stage error if serialization fails.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value).map(Bytes::from).map_err(Error::decode)
}

/// Serialize a value to form URL-encoded bytes.
///
/// Uses `serde_html_form`, which supports `Vec<T>` for repeated form fields
/// (e.g. `tags=a&tags=b`).
///
/// # Errors
///
/// Returns a decode-stage error if serialization fails.
pub fn to_form<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Error::decode)
}

/// Deserialize JSON bytes with path-aware error causes.
///
/// Uses `serde_path_to_error` so a decode failure names the exact field that
/// failed (e.g. `user.address.city`).
///
/// # Errors
///
/// Returns a decode error carrying the path-aware cause.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(Error::decode)
}
