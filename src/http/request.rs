//! Request description and construction.
//!
//! # Responsibilities
//! - Describe one call (pattern, substitutions, payload, transport options)
//! - Attach the access token headers (`x-access-token`, and
//!   `x-access-token-v2` when an RS256 token was issued)
//! - Place the payload: base64 query parameter for GET, JSON body for POST
//!
//! # Design Decisions
//! - GET never carries a body
//! - An absent payload is treated as `{}` for signing and for POST bodies
//! - "Has data" follows key count: empty objects, arrays and strings, and all
//!   scalars, add no query parameter

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use serde_json::{Map, Value};

use crate::http::endpoint::Substitutions;
use crate::transport::{TransportOptions, TransportRequest};

/// Header carrying the signed access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Header carrying the RS256 access token.
pub const ACCESS_TOKEN_V2_HEADER: &str = "x-access-token-v2";

/// Query parameter carrying a GET payload.
pub const PAYLOAD_QUERY_PARAM: &str = "payload";

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Lowercase label used in metrics and log records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
        }
    }

    pub fn is_idempotent(&self) -> bool {
        matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Everything needed to issue one call.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    pub url_pattern: String,
    pub substitutions: Substitutions,
    pub payload: Option<Value>,
    /// Per-call transport options; the client's defaults apply when `None`.
    pub options: Option<TransportOptions>,
}

impl RequestDescriptor {
    pub fn new(url_pattern: impl Into<String>) -> Self {
        Self {
            url_pattern: url_pattern.into(),
            ..Default::default()
        }
    }

    /// Add a placeholder substitution.
    pub fn substitution(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.substitutions.insert(name.into(), value.into());
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The payload to sign and send; `{}` when none was given.
    pub fn payload_or_empty(&self) -> Value {
        self.payload
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// Whether a payload contributes anything to a GET request.
pub fn has_data(payload: &Value) -> bool {
    match payload {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Tokens issued for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokens {
    pub token: String,
    pub token_v2: Option<String>,
}

impl AccessTokens {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_v2: None,
        }
    }

    pub fn with_v2(mut self, token_v2: impl Into<String>) -> Self {
        self.token_v2 = Some(token_v2.into());
        self
    }

    fn into_headers(self) -> Vec<(String, String)> {
        let mut headers = vec![(ACCESS_TOKEN_HEADER.to_string(), self.token)];
        if let Some(token_v2) = self.token_v2 {
            headers.push((ACCESS_TOKEN_V2_HEADER.to_string(), token_v2));
        }
        headers
    }
}

/// Base64 of the payload's JSON serialization.
pub fn encode_query_payload(payload: &Value) -> String {
    general_purpose::STANDARD.encode(payload.to_string())
}

/// Assemble a transport request from its parts.
pub fn build_request(
    method: Method,
    url: String,
    tokens: AccessTokens,
    payload: Value,
    options: TransportOptions,
) -> TransportRequest {
    let mut query = Vec::new();
    let mut body = None;

    match method {
        Method::Get => {
            if has_data(&payload) {
                query.push((PAYLOAD_QUERY_PARAM.to_string(), encode_query_payload(&payload)));
            }
        }
        Method::Post => body = Some(payload),
    }

    TransportRequest {
        method,
        url,
        headers: tokens.into_headers(),
        query,
        body,
        options,
    }
}
