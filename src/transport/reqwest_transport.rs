//! Default transport over `reqwest`.
//!
//! # Responsibilities
//! - Issue one HTTP attempt per `AttemptObserver::on_attempt_start`
//! - Turn error responses and network errors into `TransportFailure`s
//! - Retry idempotent requests according to the per-call policy
//!
//! # Design Decisions
//! - Network errors are classified by walking the source chain for an
//!   `io::Error`, so callers see familiar codes (`ECONNREFUSED`, `ENOTFOUND`)
//! - Bodies are read as text; JSON parsing is the dispatcher's concern
//! - `retry_count` on a failure is the number of retries already made

use std::error::Error as _;
use std::io::ErrorKind;

use async_trait::async_trait;

use crate::http::Method;
use crate::resilience::RetryPolicy;
use crate::transport::{
    AttemptObserver, Transport, TransportError, TransportFailure, TransportRequest,
    TransportResponse,
};

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, pool settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn attempt(&self, request: &TransportRequest) -> Result<TransportResponse, TransportFailure> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_str());

        for (name, value) in request.headers.iter().chain(request.options.headers.iter()) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| failure_from_reqwest(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| failure_from_reqwest(&e))?;

        Ok(TransportResponse {
            status_code: status.as_u16(),
            status_message: status.canonical_reason().map(str::to_string),
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &TransportRequest,
        observer: &mut dyn AttemptObserver,
    ) -> Result<TransportResponse, TransportError> {
        let policy = RetryPolicy::from_options(&request.options);
        let mut retry_count = 0;

        loop {
            observer.on_attempt_start();

            let mut failure = match self.attempt(request).await {
                Ok(response) => {
                    observer.on_response(&response);
                    if response.status_code < 400 {
                        return Ok(response);
                    }
                    TransportFailure::from_response(&response)
                }
                Err(failure) => failure,
            };
            failure.retry_count = retry_count;

            if !policy.should_retry(request.method, &failure, retry_count) {
                observer.on_error(&failure);
                return Err(failure.into());
            }

            observer.on_retry(&failure);
            retry_count += 1;
            let delay = policy.delay(retry_count);
            tracing::debug!(
                url = %request.url,
                retry_count,
                delay_ms = delay.as_millis() as u64,
                "Retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn failure_from_reqwest(err: &reqwest::Error) -> TransportFailure {
    TransportFailure {
        name: Some("RequestError".to_string()),
        code: error_code(err).map(str::to_string),
        message: err.to_string(),
        ..Default::default()
    }
}

/// Best-effort mapping of a reqwest error onto a network error code.
fn error_code(err: &reqwest::Error) -> Option<&'static str> {
    if err.is_timeout() {
        return Some("ETIMEDOUT");
    }

    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            match io.kind() {
                ErrorKind::ConnectionRefused => return Some("ECONNREFUSED"),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                    return Some("ECONNRESET")
                }
                ErrorKind::TimedOut => return Some("ETIMEDOUT"),
                ErrorKind::BrokenPipe => return Some("EPIPE"),
                ErrorKind::AddrInUse => return Some("EADDRINUSE"),
                _ => {}
            }
        }
        let text = inner.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return Some("ENOTFOUND");
        }
        source = inner.source();
    }

    if err.is_connect() {
        return Some("ECONNREFUSED");
    }
    if err.is_builder() {
        return Some("EINVALIDURL");
    }
    None
}
