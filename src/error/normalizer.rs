//! Error normalization.
//!
//! # Precedence
//! ```text
//! 1. status 400..=499            → status, code = status
//! 2. nested error object         → code = name | code | EUNSPECIFIED
//! 3. no nested error object      → code = bare code | ENOERROR
//! status for 2/3: explicit status if present, else status_for_code(code)
//! ```
//!
//! The rules are applied in that order, once. Errors that are already a
//! `ClientError` never reach this module.

use serde_json::Value;

use crate::error::{ClientError, ErrorCode};
use crate::transport::TransportFailure;

/// Code used when a nested error names nothing.
pub const UNSPECIFIED: &str = "EUNSPECIFIED";

/// Code used when a bare error carries no code.
pub const NO_ERROR: &str = "ENOERROR";

/// Status derived from a code when no explicit status is available.
pub fn status_for_code(code: &str) -> u16 {
    match code {
        // no dns resolution
        "ENOTFOUND" => 502,
        // connection rejected
        "ECONNREFUSED" => 503,
        _ => 500,
    }
}

/// A string or number field of a nested error, as a code.
fn field_code(error: &Value, field: &str) -> Option<String> {
    match error.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Classify a transport failure into a [`ClientError`].
pub fn normalize(failure: &TransportFailure) -> ClientError {
    if let Some(status) = failure.status_code.filter(|s| (400..500).contains(s)) {
        return ClientError::transport(status, ErrorCode::Status(status));
    }

    let code = match failure.nested_error() {
        Some(error) => field_code(error, "name")
            .or_else(|| field_code(error, "code"))
            .unwrap_or_else(|| UNSPECIFIED.to_string()),
        None => failure
            .code
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| NO_ERROR.to_string()),
    };

    let status = failure
        .status_code
        .unwrap_or_else(|| status_for_code(&code));
    ClientError::transport(status, ErrorCode::Name(code))
}
