//! Helpers shared by the descriptor builders.

use std::fs;

use chrono::{DateTime, Utc};

use crate::error::CliError;

/// Payload sent when none is given; the API rejects an empty one.
pub const EMPTY_PAYLOAD: &str = "{}";

/// Payload from `file` when set, otherwise `inline`, otherwise `{}`.
///
/// # Errors
///
/// Returns [`CliError::File`] if `file` cannot be read.
pub fn resolve_payload(inline: &str, file: &str) -> Result<String, CliError> {
    let payload = if file.is_empty() {
        inline.to_string()
    } else {
        read_file(file)?
    };
    if payload.is_empty() {
        Ok(EMPTY_PAYLOAD.to_string())
    } else {
        Ok(payload)
    }
}

/// Read a whole file named by a flag.
///
/// # Errors
///
/// Returns [`CliError::File`] naming the path.
pub fn read_file(path: &str) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| CliError::file(path, e))
}

/// Drop unset and zero values so the service picks its default.
#[must_use]
pub fn positive(value: Option<u64>) -> Option<u64> {
    value.filter(|v| *v > 0)
}

/// Drop empty strings.
#[must_use]
pub fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse an optional RFC3339 timestamp flag; empty means unset.
///
/// # Errors
///
/// Returns [`CliError::Validation`] if the value is not RFC3339.
pub fn parse_timestamp(flag: &str, value: &str) -> Result<Option<DateTime<Utc>>, CliError> {
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|e| CliError::validation(format!("invalid --{flag} {value:?}: {e}")))
}

/// The single positional argument, or a validation error with `message`.
///
/// # Errors
///
/// Returns [`CliError::Validation`] unless exactly one argument is given.
pub fn single_arg(args: &[String], message: &str) -> Result<String, CliError> {
    match args {
        [only] => Ok(only.clone()),
        _ => Err(CliError::validation(message)),
    }
}
