// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal)
// Interpolation and validation happen between these and the public types.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub chatstream: String,
    pub endpoint: RawEndpointConfig,
    pub stream: Option<RawStreamConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEndpointConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStreamConfig {
    pub max_pending_bytes: Option<usize>,
}
