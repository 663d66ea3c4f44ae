// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

use crate::stream::DEFAULT_MAX_PENDING_BYTES;

use super::error::ConfigError;
use super::loader::validate_url;

/// Top-level parsed and validated chatstream config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Config schema version. Always "v1".
    pub version: String,
    pub endpoint: EndpointConfig,
    pub stream: StreamConfig,
}

impl Config {
    /// Config for `url` with every optional setting at its default.
    pub fn for_url(url: &str) -> Result<Self, ConfigError> {
        validate_url(url)?;
        Ok(Self {
            version: "v1".to_string(),
            endpoint: EndpointConfig {
                url: url.to_string(),
                api_key: None,
                timeout_ms: None,
            },
            stream: StreamConfig::default(),
        })
    }

    /// Replace the endpoint URL, keeping every other setting.
    pub fn with_url(mut self, url: &str) -> Result<Self, ConfigError> {
        validate_url(url)?;
        self.endpoint.url = url.to_string();
        Ok(self)
    }
}

/// The chat endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Absolute http(s) URL the message history is POSTed to.
    pub url: String,
    /// Sent as `Authorization: Bearer <key>`.
    pub api_key: Option<String>,
    /// Per-request timeout. `None` means no timeout.
    pub timeout_ms: Option<u64>,
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Stream consumption limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Largest unparseable fragment held while waiting for more bytes.
    pub max_pending_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_pending_bytes: DEFAULT_MAX_PENDING_BYTES,
        }
    }
}
