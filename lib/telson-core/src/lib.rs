//! Core types for the telson fluent HTTP client.
//!
//! This crate provides the builder-to-transport-to-decoder pipeline:
//! - [`Builder`] - fluent, copy-on-write request construction
//! - [`Transport`] - pluggable execution capability (consumed, not implemented)
//! - [`Error`] and [`Result`] - the single failure taxonomy
//! - [`Decoder`], [`TextEncoding`], [`DecoderRegistry`] - response decoding
//! - [`HttpConfig`] - process-wide defaults with per-step override
//! - [`Publisher`] and [`Receipt`] - the two single-shot delivery surfaces
//! - [`Queue`] - execution context for callback delivery
//! - [`StatusCode`] and [`header`] - re-exported from the `http` crate

mod body;
mod builder;
mod config;
mod decode;
mod error;
mod headers;
mod method;
mod multipart;
pub mod prelude;
mod publisher;
mod queue;
mod request;
mod response;
mod transport;

pub use body::{ContentType, from_json, to_form, to_json};
pub use builder::Builder;
pub use config::{HttpConfig, HttpConfigBuilder};
pub use decode::{Decoder, DecoderRegistry, TextEncoding};
pub use error::{BoxError, Error, Result};
pub use headers::Headers;
pub use method::Method;
pub use multipart::{Form, Part};
pub use publisher::{CancelHandle, PipelineFuture, Publisher, Receipt};
pub use queue::Queue;
pub use request::Request;
pub use response::Response;
pub use transport::{Transport, TransportExt};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
