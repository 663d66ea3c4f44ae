// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;

/// Resolves `${VAR_NAME}` references in a string from environment variables.
/// Returns `ConfigError::UndefinedVariable` if a referenced variable is not set.
pub fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    resolve_with(input, |name| std::env::var(name).ok())
}

/// Same as [`resolve_variables`] with an explicit lookup.
pub(crate) fn resolve_with<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }

        chars.next(); // consume '{'
        let mut var_name = String::new();
        let mut found_close = false;
        for c in chars.by_ref() {
            if c == '}' {
                found_close = true;
                break;
            }
            var_name.push(c);
        }
        if !found_close || var_name.is_empty() {
            // Malformed interpolation -- keep literally
            result.push_str("${");
            result.push_str(&var_name);
            if found_close {
                result.push('}');
            }
            continue;
        }
        let value = lookup(&var_name).ok_or(ConfigError::UndefinedVariable { name: var_name })?;
        result.push_str(&value);
    }

    Ok(result)
}
