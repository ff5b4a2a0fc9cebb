//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher
//!     → TransportRequest (url, headers, query, body, options)
//!     → Transport::execute
//!         → attempt 1 ... attempt N (retries owned by the transport)
//!         → AttemptObserver stages fire around every attempt
//!     → TransportResponse | TransportError
//! ```
//!
//! # Design Decisions
//! - `Transport` is a trait so the dispatcher never depends on one HTTP crate
//! - Options pass through the dispatcher unmodified
//! - Failures are plain data (`TransportFailure`) until the normalizer sees them
//! - A `ClientError` surfacing from below travels in its own variant and is
//!   never normalized again

pub mod reqwest_transport;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::http::Method;

pub use reqwest_transport::ReqwestTransport;

/// Per-call transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Deadline for a single attempt.
    pub timeout: Option<Duration>,
    /// Retries after the first attempt (idempotent methods only).
    pub retry_limit: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Extra headers sent with every attempt.
    pub headers: Vec<(String, String)>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            retry_limit: 2,
            retry_base_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_millis(2000),
            headers: Vec::new(),
        }
    }
}

/// A fully built request, ready for the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub options: TransportOptions,
}

/// A received response with its raw body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status_code: u16,
    pub status_message: Option<String>,
    pub body: String,
}

/// A failed attempt, described as data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransportFailure {
    /// Error name (`HTTPError`, `RequestError`, `ParseError`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Bare error code (`ECONNREFUSED`, `ETIMEDOUT`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Nested error object or response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    pub message: String,
    pub retry_count: u32,
}

impl TransportFailure {
    /// Failure built from an error response.
    pub fn from_response(response: &TransportResponse) -> Self {
        let error = serde_json::from_str::<Value>(&response.body).ok();
        Self {
            name: Some("HTTPError".to_string()),
            status_code: Some(response.status_code),
            status_message: response.status_message.clone(),
            message: format!("Response code {}", response.status_code),
            error,
            ..Default::default()
        }
    }

    /// The nested error object, when one is present.
    ///
    /// Only JSON objects and arrays count; scalar bodies are ignored.
    pub fn nested_error(&self) -> Option<&Value> {
        self.error
            .as_ref()
            .filter(|value| value.is_object() || value.is_array())
    }
}

/// Error returned by a transport.
#[derive(Debug, Clone)]
pub enum TransportError {
    Failure(TransportFailure),
    /// Raised by a nested call through the same client; passed through as is.
    Client(ClientError),
}

impl From<TransportFailure> for TransportError {
    fn from(failure: TransportFailure) -> Self {
        TransportError::Failure(failure)
    }
}

impl From<ClientError> for TransportError {
    fn from(err: ClientError) -> Self {
        TransportError::Client(err)
    }
}

/// Pipeline stages invoked by the transport around each attempt.
pub trait AttemptObserver: Send {
    /// Before every attempt, including retries.
    fn on_attempt_start(&mut self);

    /// A response arrived, whatever its status.
    fn on_response(&mut self, response: &TransportResponse);

    /// The attempt failed and another one will follow.
    fn on_retry(&mut self, failure: &TransportFailure);

    /// The attempt failed and no retry will follow.
    fn on_error(&mut self, failure: &TransportFailure);
}

/// Observer that ignores every stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AttemptObserver for NoopObserver {
    fn on_attempt_start(&mut self) {}
    fn on_response(&mut self, _response: &TransportResponse) {}
    fn on_retry(&mut self, _failure: &TransportFailure) {}
    fn on_error(&mut self, _failure: &TransportFailure) {}
}

/// Executes requests on behalf of the dispatcher.
///
/// `Ok` should carry a 2xx/3xx response once retries are exhausted, and
/// error statuses should come back as [`TransportFailure::from_response`].
/// The dispatcher does not rely on this: an `Ok` response with status >= 400
/// is still treated as an `HTTPError` failure.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: &TransportRequest,
        observer: &mut dyn AttemptObserver,
    ) -> Result<TransportResponse, TransportError>;
}
