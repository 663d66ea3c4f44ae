// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads chatstream.yaml, validates structure and resolves `${VAR}`
// interpolation in endpoint settings.

mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::load_config;
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{Config, EndpointConfig, StreamConfig};
