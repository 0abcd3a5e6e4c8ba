//! Prelude module for convenient imports.
//!
//! ```ignore
//! use telson_core::prelude::*;
//! ```

pub use crate::{
    Builder, ContentType, Decoder, Error, Form, Headers, HttpConfig, Method, Part, Publisher,
    Queue, Receipt, Request, Response, Result, TextEncoding, Transport, TransportExt, from_json,
    to_form, to_json,
};
