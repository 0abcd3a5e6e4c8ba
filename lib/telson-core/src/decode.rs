//! Response decoding.
//!
//! Three strategies, selected by the terminal call used: raw bytes
//! passthrough, string decode under a [`TextEncoding`], and structured decode
//! through a [`Decoder`]. A decoder may carry a [`ContentType`] hint; the
//! builder turns the hint into an `Accept` header before dispatch.
//!
//! Custom decoders can also live in a [`DecoderRegistry`] keyed by target
//! type, probed only when a terminal call does not name a decoder explicitly.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::{BoxError, ContentType, Error, Result};

// ============================================================================
// Text encodings
// ============================================================================

/// Text codec for string results.
///
/// A mismatch (bytes invalid under the codec) is a decode error with no
/// cause, distinguishing it from a decoder that failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, the default.
    #[default]
    Utf8,
    /// UTF-16, little-endian.
    Utf16Le,
    /// UTF-16, big-endian.
    Utf16Be,
    /// ISO-8859-1; every byte maps to its code point, never fails.
    Latin1,
}

impl TextEncoding {
    /// Decode `bytes` under this codec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] with no cause when the bytes are not valid
    /// for the codec.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| Error::decode_mismatch()),
            Self::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Self::Latin1 => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::decode_mismatch());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            let mut buf = [0u8; 2];
            buf.copy_from_slice(pair);
            unit(buf)
        })
        .collect();
    String::from_utf16(&units).map_err(|_| Error::decode_mismatch())
}

// ============================================================================
// Decoder
// ============================================================================

type DecodeFn<T> = Arc<dyn Fn(&Bytes) -> Result<T> + Send + Sync>;

/// A pluggable bytes-to-value mapping with an optional content-type hint.
///
/// The hint drives content negotiation: when present, the dispatch pipeline
/// sets an `Accept` header from it unless the builder already set one.
pub struct Decoder<T> {
    hint: Option<ContentType>,
    decode: DecodeFn<T>,
}

impl<T> Clone for Decoder<T> {
    fn clone(&self) -> Self {
        Self {
            hint: self.hint,
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<T> std::fmt::Debug for Decoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("hint", &self.hint)
            .finish_non_exhaustive()
    }
}

impl<T> Decoder<T> {
    /// Create a decoder from a fallible mapping; a raised failure is wrapped
    /// as a decode error carrying the cause.
    #[must_use]
    pub fn new<F>(decode: F) -> Self
    where
        F: Fn(&Bytes) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            hint: None,
            decode: Arc::new(move |bytes| decode(bytes).map_err(Error::decode)),
        }
    }

    /// Like [`Decoder::new`], with a content-type hint for negotiation.
    #[must_use]
    pub fn with_hint<F>(hint: ContentType, decode: F) -> Self
    where
        F: Fn(&Bytes) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            hint: Some(hint),
            ..Self::new(decode)
        }
    }

    pub(crate) fn from_pipeline<F>(hint: Option<ContentType>, decode: F) -> Self
    where
        F: Fn(&Bytes) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            hint,
            decode: Arc::new(decode),
        }
    }

    /// The content-type hint, if any.
    #[must_use]
    pub const fn content_hint(&self) -> Option<ContentType> {
        self.hint
    }

    /// Run the decoder over response bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when the mapping fails.
    pub fn decode(&self, bytes: &Bytes) -> Result<T> {
        (self.decode)(bytes)
    }
}

impl Decoder<Bytes> {
    /// Passthrough decoder: yields the raw response bytes.
    #[must_use]
    pub fn raw() -> Self {
        Self::from_pipeline(None, |bytes| Ok(bytes.clone()))
    }
}

impl Decoder<String> {
    /// String decoder under a text codec. Mismatches yield a decode error
    /// with no cause.
    #[must_use]
    pub fn text(encoding: TextEncoding) -> Self {
        Self::from_pipeline(None, move |bytes| encoding.decode(bytes))
    }
}

impl<T: serde::de::DeserializeOwned> Decoder<T> {
    /// JSON decoder via serde, hinted as `application/json`.
    #[must_use]
    pub fn json() -> Self {
        Self::from_pipeline(Some(ContentType::Json), |bytes| crate::from_json(bytes))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Type-keyed registry of custom decoders.
///
/// An ordinary keyed lookup: decoders are stored under the [`TypeId`] of
/// their target type at configuration-construction time and probed by type at
/// decode time. Consulted only when a terminal call names no decoder.
#[derive(Debug, Clone, Default)]
pub struct DecoderRegistry {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl DecoderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a decoder for `T`, replacing any previous one.
    pub fn insert<T: 'static>(&mut self, decoder: Decoder<T>) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(decoder));
    }

    /// Looks up the decoder registered for `T`.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<Decoder<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Decoder<T>>())
            .cloned()
    }

    /// Returns `true` if a decoder for `T` is registered.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }
}
