//! Environment variable parsing utilities.

use std::str::FromStr;

use super::ConfigError;

/// Get optional environment variable (None if empty or missing).
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

/// Parse an optional raw value read under `key`.
pub fn parse_opt<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Parse {
                key: key.into(),
                value: v,
                error: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Parse a boolean flag. Treats "1", "true" (case-insensitive) as true.
pub fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
