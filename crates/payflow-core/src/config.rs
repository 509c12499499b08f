//! Helpers for reading settings from environment-style key/value lookups.
//!
//! Loaders take a lookup function rather than reading `std::env` directly so
//! they can be exercised with a plain map.

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// A key/value lookup, usually `|key| std::env::var(key).ok()`.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Configuration loading errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    /// A setting is present but cannot be parsed.
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Returns the trimmed value for `key`, treating blank values as absent.
#[must_use]
pub fn optional(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Returns the value for `key`.
///
/// # Errors
///
/// Returns `ConfigError::Missing` if the key is absent or blank.
pub fn required(lookup: Lookup<'_>, key: &'static str) -> Result<String, ConfigError> {
    optional(lookup, key).ok_or(ConfigError::Missing(key))
}

/// Parses the value for `key`, falling back to `default` when absent.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` if the value does not parse as `T`.
pub fn parsed_or<T>(lookup: Lookup<'_>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match optional(lookup, key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Parses a strictly positive integer setting.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` if the value does not parse or is zero.
pub fn positive_or(
    lookup: Lookup<'_>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let value = parsed_or(lookup, key, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_owned(),
        });
    }
    Ok(value)
}
