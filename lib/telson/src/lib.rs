//! Fluent HTTP request builder for Rust.
//!
//! Compose a request through a fluent chain, dispatch it through a pluggable
//! transport, and decode the response into a typed value with one error
//! taxonomy for transport, status, and decode failures.
//!
//! # Example
//!
//! ```ignore
//! use telson::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let transport = HyperTransport::new();
//! let user: User = transport
//!     .build("https://api.example.com/users/42")
//!     .header("X-Trace", "1")
//!     .publisher_decoding()
//!     .await?;
//! ```

mod client;
mod config;
pub mod prelude;

// Re-export transport types
pub use client::HyperTransport;
pub use config::{TransportConfig, TransportConfigBuilder};

// Re-export core types
pub use telson_core::{
    BoxError, Builder, CancelHandle, ContentType, Decoder, DecoderRegistry, Error, Form, Headers,
    HttpConfig, HttpConfigBuilder, Method, Part, PipelineFuture, Publisher, Queue, Receipt,
    Request, Response, Result, TextEncoding, Transport, TransportExt, from_json, to_form, to_json,
};

// Re-export http types for status codes and headers
pub use telson_core::{StatusCode, header};
