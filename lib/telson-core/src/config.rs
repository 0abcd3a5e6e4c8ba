//! Process-wide request configuration.
//!
//! An [`HttpConfig`] is consulted when a builder is created and is read-only
//! afterwards: permitted status codes, default headers merged under
//! builder-set headers, a default callback [`Queue`], and the type-keyed
//! [`DecoderRegistry`] probed when no explicit decoder is supplied.

use std::collections::HashSet;
use std::sync::Arc;

use crate::decode::{Decoder, DecoderRegistry, TextEncoding};
use crate::{Headers, Queue};

/// Defaults applied to every dispatch, overridable per builder step.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    permitted_statuses: HashSet<u16>,
    default_headers: Headers,
    default_queue: Option<Queue>,
    decoders: DecoderRegistry,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let mut decoders = DecoderRegistry::new();
        decoders.insert(Decoder::<String>::text(TextEncoding::Utf8));

        Self {
            permitted_statuses: (200..=205).collect(),
            default_headers: Headers::new(),
            default_queue: None,
            decoders,
        }
    }
}

impl HttpConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::default()
    }

    /// Default configuration behind an [`Arc`], ready to share across
    /// builders.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns `true` if `status` is in the permitted set.
    #[must_use]
    pub fn permits(&self, status: u16) -> bool {
        self.permitted_statuses.contains(&status)
    }

    /// Headers merged under builder-set headers; the builder wins per key.
    #[must_use]
    pub const fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    /// Queue callbacks fire on when a terminal call names none.
    #[must_use]
    pub const fn default_queue(&self) -> Option<&Queue> {
        self.default_queue.as_ref()
    }

    /// Look up the registered decoder for `T`.
    #[must_use]
    pub fn decoder<T: 'static>(&self) -> Option<Decoder<T>> {
        self.decoders.get::<T>()
    }
}

/// Builder for [`HttpConfig`].
#[derive(Debug, Default)]
pub struct HttpConfigBuilder {
    permitted_statuses: Option<HashSet<u16>>,
    default_headers: Headers,
    default_queue: Option<Queue>,
    decoders: Option<DecoderRegistry>,
}

impl HttpConfigBuilder {
    /// Replace the permitted status code set.
    #[must_use]
    pub fn permitted_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.permitted_statuses = Some(statuses.into_iter().collect());
        self
    }

    /// Add a default header.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.set(name, value);
        self
    }

    /// Set the default callback queue.
    #[must_use]
    pub fn default_queue(mut self, queue: Queue) -> Self {
        self.default_queue = Some(queue);
        self
    }

    /// Register a custom decoder for its target type.
    ///
    /// Starts from the default registry (UTF-8 `String` pre-registered) on
    /// first call.
    #[must_use]
    pub fn decoder<T: 'static>(mut self, decoder: Decoder<T>) -> Self {
        self.decoders
            .get_or_insert_with(|| HttpConfig::default().decoders)
            .insert(decoder);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            permitted_statuses: self
                .permitted_statuses
                .unwrap_or(defaults.permitted_statuses),
            default_headers: self.default_headers,
            default_queue: self.default_queue,
            decoders: self.decoders.unwrap_or(defaults.decoders),
        }
    }

    /// Build and wrap in an [`Arc`].
    #[must_use]
    pub fn build_shared(self) -> Arc<HttpConfig> {
        Arc::new(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_permits_200_through_205() {
        let config = HttpConfig::default();
        for status in 200..=205 {
            assert!(config.permits(status), "{status} should be permitted");
        }
        assert!(!config.permits(206));
        assert!(!config.permits(404));
    }

    #[test]
    fn default_registry_decodes_strings() {
        let config = HttpConfig::default();
        let decoder = config.decoder::<String>().expect("string pre-registered");
        let decoded = decoder
            .decode(&bytes::Bytes::from_static(b"plain"))
            .expect("decode");
        assert_eq!(decoded, "plain");
    }

    #[test]
    fn builder_overrides_permitted_statuses() {
        let config = HttpConfig::builder()
            .permitted_statuses([200, 418])
            .build();

        assert!(config.permits(418));
        assert!(!config.permits(201));
    }

    #[test]
    fn builder_collects_default_headers() {
        let config = HttpConfig::builder()
            .default_header("User-Agent", "telson")
            .default_header("Accept", "application/json")
            .build();

        assert_eq!(config.default_headers().get("user-agent"), Some("telson"));
        assert_eq!(config.default_headers().len(), 2);
    }

    #[test]
    fn builder_registers_custom_decoder() {
        #[derive(Debug, PartialEq)]
        struct Version(u8);

        let config = HttpConfig::builder()
            .decoder(Decoder::new(|bytes: &bytes::Bytes| {
                Ok(Version(bytes.first().copied().unwrap_or(0)))
            }))
            .build();

        let decoder = config.decoder::<Version>().expect("registered");
        let decoded = decoder
            .decode(&bytes::Bytes::from_static(&[3]))
            .expect("decode");
        assert_eq!(decoded, Version(3));

        // the default String decoder survives custom registration
        assert!(config.decoder::<String>().is_some());
    }
}
