// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a chatstream config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Parse YAML into raw deserialization types
/// 3. Validate the version tag
/// 4. Resolve variable interpolation in string fields
/// 5. Validate endpoint and stream settings
/// 6. Build typed Config struct
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.chatstream != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.chatstream
        )));
    }

    let endpoint = build_endpoint_config(raw.endpoint)?;
    let stream = build_stream_config(raw.stream)?;

    Ok(Config {
        version: raw.chatstream,
        endpoint,
        stream,
    })
}

fn build_endpoint_config(raw: raw::RawEndpointConfig) -> Result<EndpointConfig, ConfigError> {
    let url = resolve_variables(raw.url.trim())?;
    validate_url(&url)?;

    // An interpolated key that resolves to nothing means "no key".
    let api_key = match raw.api_key {
        Some(key) => {
            let key = resolve_variables(&key)?;
            let key = key.trim();
            if key.chars().any(|c| c.is_control()) {
                return Err(ConfigError::Validation(
                    "endpoint.api_key must not contain control characters".to_string(),
                ));
            }
            (!key.is_empty()).then(|| key.to_string())
        }
        None => None,
    };

    if raw.timeout_ms == Some(0) {
        return Err(ConfigError::Validation(
            "endpoint.timeout_ms must be greater than 0".to_string(),
        ));
    }

    Ok(EndpointConfig {
        url,
        api_key,
        timeout_ms: raw.timeout_ms,
    })
}

fn build_stream_config(raw: Option<raw::RawStreamConfig>) -> Result<StreamConfig, ConfigError> {
    let mut config = StreamConfig::default();
    if let Some(max) = raw.and_then(|r| r.max_pending_bytes) {
        if max == 0 {
            return Err(ConfigError::Validation(
                "stream.max_pending_bytes must be greater than 0".to_string(),
            ));
        }
        config.max_pending_bytes = max;
    }
    Ok(config)
}

/// The endpoint must be an absolute http or https URL.
pub(crate) fn validate_url(url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| {
        ConfigError::Validation(format!("endpoint.url \"{url}\" is not a valid URL: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "endpoint.url scheme \"{other}\" is not supported, expected http or https"
        ))),
    }
}
