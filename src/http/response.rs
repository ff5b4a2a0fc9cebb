//! Response body coercion.
//!
//! A successful call always resolves to a JSON value: blank bodies become
//! `{}`, anything else is parsed and returned unchanged.

use serde_json::{Map, Value};

use crate::transport::{TransportFailure, TransportResponse};

/// Whether a raw body is empty or whitespace only.
pub fn is_blank(body: &str) -> bool {
    body.trim().is_empty()
}

/// Coerce a successful response body into a value.
///
/// Non-JSON bodies yield a `ParseError` failure with code `EINVALIDJSON`.
pub fn coerce_body(response: &TransportResponse) -> Result<Value, TransportFailure> {
    if is_blank(&response.body) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(&response.body).map_err(|e| TransportFailure {
        name: Some("ParseError".to_string()),
        code: Some("EINVALIDJSON".to_string()),
        message: e.to_string(),
        ..Default::default()
    })
}
