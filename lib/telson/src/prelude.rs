//! Prelude module for convenient imports.
//!
//! ```ignore
//! use telson::prelude::*;
//! ```

pub use crate::{
    Builder, ContentType, Decoder, Error, Form, Headers, HttpConfig, HyperTransport, Method, Part,
    Publisher, Queue, Receipt, Request, Response, Result, StatusCode, TextEncoding, Transport,
    TransportConfig, TransportExt, from_json, header, to_form, to_json,
};
pub use serde::{Deserialize, Serialize};
