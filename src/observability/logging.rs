//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for binaries and tests
//! - Define the per-call logger interface used by the dispatcher
//! - Compose the single-line error message
//!
//! # Message Format
//! ```text
//! JWT <type> request error: <client>: <METHOD> <base_url><url> - <name> - <code> - <status> - <status message> - <body json>
//! ```
//! Missing segments stay empty so the separators never shift.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via `RUST_LOG`, with a caller-supplied default
//! - `<type>` is `client` for single attempts, `API` for the final outcome

use std::fmt;

use serde_json::{json, Value};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ClientError;
use crate::observability::metrics::RequestLabels;
use crate::transport::TransportFailure;

/// Which stage of the pipeline an error record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// One attempt (error response or retried failure).
    Client,
    /// The overall outcome of `send`.
    Api,
}

impl ErrorScope {
    /// Value of the record's `name` label.
    pub fn record_name(&self) -> &'static str {
        match self {
            ErrorScope::Client => "jwt_client_request_error",
            ErrorScope::Api => "jwt_api_request_error",
        }
    }
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorScope::Client => f.write_str("client"),
            ErrorScope::Api => f.write_str("API"),
        }
    }
}

/// Structured record handed to a [`RequestLogger`].
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub name: String,
    pub client_name: String,
    pub base_url: String,
    pub url: String,
    pub method: String,
    /// The raw error as JSON.
    pub error: Value,
}

/// Message segments describing one error; empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSummary {
    pub name: String,
    pub code: String,
    pub status_code: String,
    pub status_message: String,
    pub body: String,
}

impl From<&TransportFailure> for ErrorSummary {
    fn from(failure: &TransportFailure) -> Self {
        Self {
            name: failure.name.clone().unwrap_or_default(),
            code: failure.code.clone().unwrap_or_default(),
            status_code: failure.status_code.map(|s| s.to_string()).unwrap_or_default(),
            status_message: failure.status_message.clone().unwrap_or_default(),
            body: failure.error.as_ref().map(Value::to_string).unwrap_or_default(),
        }
    }
}

impl From<&ClientError> for ErrorSummary {
    fn from(err: &ClientError) -> Self {
        Self {
            name: err.name().to_string(),
            code: err.code().to_string(),
            status_code: err.status_code().to_string(),
            ..Default::default()
        }
    }
}

/// Compose the single-line error message.
pub fn format_error_message(scope: ErrorScope, labels: &RequestLabels, summary: &ErrorSummary) -> String {
    format!(
        "JWT {scope} request error: {}: {} {}{} - {} - {} - {} - {} - {}",
        labels.client_name,
        labels.method.to_uppercase(),
        labels.base_url,
        labels.url,
        summary.name,
        summary.code,
        summary.status_code,
        summary.status_message,
        summary.body,
    )
}

/// Build the structured record for a failed attempt.
pub fn failure_record(scope: ErrorScope, labels: &RequestLabels, failure: &TransportFailure) -> ErrorRecord {
    record(scope, labels, serde_json::to_value(failure).unwrap_or(Value::Null))
}

/// Build the structured record for an error that is already a `ClientError`.
pub fn client_error_record(scope: ErrorScope, labels: &RequestLabels, err: &ClientError) -> ErrorRecord {
    let error = json!({
        "name": err.name(),
        "code": err.code().to_string(),
        "statusCode": err.status_code(),
        "message": err.message(),
    });
    record(scope, labels, error)
}

fn record(scope: ErrorScope, labels: &RequestLabels, error: Value) -> ErrorRecord {
    ErrorRecord {
        name: scope.record_name().to_string(),
        client_name: labels.client_name.clone(),
        base_url: labels.base_url.clone(),
        url: labels.url.clone(),
        method: labels.method.clone(),
        error,
    }
}

/// Receives error records from the dispatcher.
pub trait RequestLogger: Send + Sync {
    fn error(&self, record: &ErrorRecord, message: &str);
}

/// Logger emitting `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn error(&self, record: &ErrorRecord, message: &str) {
        tracing::error!(
            name = %record.name,
            client_name = %record.client_name,
            base_url = %record.base_url,
            url = %record.url,
            method = %record.method,
            error = %record.error,
            "{}",
            message
        );
    }
}

/// Install a global fmt subscriber filtered by `RUST_LOG`, else `default_filter`.
pub fn init_logging(default_filter: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
