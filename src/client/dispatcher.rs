//! Request dispatch.
//!
//! # Responsibilities
//! - Build the transport request (URL, token, payload placement, options)
//! - Drive the API timer for the call and a request timer per attempt
//! - Coerce successful bodies and normalize failures
//! - Emit error records to the caller's logger
//!
//! # Data Flow
//! ```text
//! send(method, descriptor, logger)
//!     → create_request_options (templating / signing errors surface here)
//!     → API timer start
//!     → Transport::execute ── AttemptReporter stages
//!           on_attempt_start: request timer start
//!           on_response:      request timer stop, client record if >= 400
//!           on_retry:         request timer stop, client record if no status
//!           on_error:         request timer stop
//!     → coerce_body | normalize
//!     → API timer stop, API record on failure
//! ```
//!
//! # Design Decisions
//! - A request timer is stopped exactly once per attempt; a timer left
//!   running by a transport that skipped a stage is stopped without labels
//! - Errors that are already `ClientError`s are returned unchanged
//! - A transport that resolves an error status as `Ok` still fails the call:
//!   any response with status >= 400 is turned into an `HTTPError` failure

use serde_json::Value;

use crate::client::JwtClient;
use crate::error::normalizer::normalize;
use crate::error::ClientResult;
use crate::http::request::build_request;
use crate::http::response::coerce_body;
use crate::http::{Method, RequestDescriptor};
use crate::observability::logging::{
    client_error_record, failure_record, format_error_message, ErrorScope, ErrorSummary,
    RequestLogger,
};
use crate::observability::{RequestLabels, ResponseLabels, Timer, TimerFactory};
use crate::transport::{
    AttemptObserver, TransportError, TransportFailure, TransportRequest, TransportResponse,
};

/// Observer turning transport stages into timer and log calls.
struct AttemptReporter<'a> {
    labels: &'a RequestLabels,
    metrics: &'a dyn TimerFactory,
    logger: Option<&'a dyn RequestLogger>,
    timer: Option<Box<dyn Timer>>,
}

impl<'a> AttemptReporter<'a> {
    fn new(
        labels: &'a RequestLabels,
        metrics: &'a dyn TimerFactory,
        logger: Option<&'a dyn RequestLogger>,
    ) -> Self {
        Self {
            labels,
            metrics,
            logger,
            timer: None,
        }
    }

    fn stop_timer(&mut self, labels: &ResponseLabels) {
        if let Some(timer) = self.timer.take() {
            timer.stop(labels);
        }
    }

    fn log_attempt(&self, failure: &TransportFailure) {
        if let Some(logger) = self.logger {
            log_failure(logger, ErrorScope::Client, self.labels, failure);
        }
    }

    /// Stop a timer the transport left running.
    fn close(mut self) {
        self.stop_timer(&ResponseLabels::default());
    }
}

impl AttemptObserver for AttemptReporter<'_> {
    fn on_attempt_start(&mut self) {
        self.stop_timer(&ResponseLabels::default());
        self.timer = Some(self.metrics.start_timer(self.labels));
    }

    fn on_response(&mut self, response: &TransportResponse) {
        if response.status_code >= 400 {
            self.log_attempt(&TransportFailure::from_response(response));
        }
        self.stop_timer(&ResponseLabels::from_response(response));
    }

    fn on_retry(&mut self, failure: &TransportFailure) {
        // Error responses were already logged by on_response.
        if failure.status_code.is_none() {
            self.log_attempt(failure);
        }
        self.stop_timer(&ResponseLabels::from_failure(failure));
    }

    fn on_error(&mut self, failure: &TransportFailure) {
        self.stop_timer(&ResponseLabels::from_failure(failure));
    }
}

fn log_failure(
    logger: &dyn RequestLogger,
    scope: ErrorScope,
    labels: &RequestLabels,
    failure: &TransportFailure,
) {
    let record = failure_record(scope, labels, failure);
    let message = format_error_message(scope, labels, &ErrorSummary::from(failure));
    logger.error(&record, &message);
}

impl JwtClient {
    /// Build the transport request for one call.
    pub fn create_request_options(
        &self,
        method: Method,
        descriptor: &RequestDescriptor,
    ) -> ClientResult<TransportRequest> {
        let url = self.create_endpoint_url(&descriptor.url_pattern, &descriptor.substitutions)?;
        let payload = descriptor.payload_or_empty();
        let tokens = self.generate_access_tokens(&payload)?;
        let options = descriptor
            .options
            .clone()
            .unwrap_or_else(|| self.default_options.clone());

        Ok(build_request(method, url, tokens, payload, options))
    }

    fn request_labels(&self, method: Method, url_pattern: &str) -> RequestLabels {
        RequestLabels {
            client_name: self.client_name.clone(),
            base_url: self.identity.base_url().to_string(),
            url: url_pattern.to_string(),
            method: method.as_str().to_string(),
        }
    }

    /// Issue a request and resolve to its JSON body.
    ///
    /// Blank bodies resolve to `{}`. Failures are normalized into a
    /// [`ClientError`](crate::error::ClientError); when `logger` is given,
    /// every failed attempt and the final failure are reported to it first.
    pub async fn send(
        &self,
        method: Method,
        descriptor: RequestDescriptor,
        logger: Option<&dyn RequestLogger>,
    ) -> ClientResult<Value> {
        let request = self.create_request_options(method, &descriptor)?;
        let labels = self.request_labels(method, &descriptor.url_pattern);

        let api_timer = self.api_metrics.start_timer(&labels);
        let mut reporter = AttemptReporter::new(&labels, self.request_metrics.as_ref(), logger);
        let outcome = self.transport.execute(&request, &mut reporter).await;
        reporter.close();

        let failure = match outcome {
            Ok(response) if response.status_code >= 400 => {
                TransportFailure::from_response(&response)
            }
            Ok(response) => match coerce_body(&response) {
                Ok(body) => {
                    api_timer.stop(&ResponseLabels::from_response(&response));
                    return Ok(body);
                }
                Err(failure) => failure,
            },
            Err(TransportError::Failure(failure)) => failure,
            Err(TransportError::Client(err)) => {
                api_timer.stop(&ResponseLabels::from_error(&err, None));
                if let Some(logger) = logger {
                    let summary = ErrorSummary::from(&err);
                    let record = client_error_record(ErrorScope::Api, &labels, &err);
                    logger.error(&record, &format_error_message(ErrorScope::Api, &labels, &summary));
                }
                return Err(err);
            }
        };

        let err = normalize(&failure);
        api_timer.stop(&ResponseLabels::from_error(&err, failure.status_message.clone()));
        if let Some(logger) = logger {
            log_failure(logger, ErrorScope::Api, &labels, &failure);
        }
        tracing::debug!(
            client_name = %labels.client_name,
            url = %request.url,
            status_code = err.status_code(),
            code = %err.code(),
            retry_count = failure.retry_count,
            "Request failed"
        );
        Err(self.finish(err))
    }

    /// `send` with GET.
    pub async fn send_get(
        &self,
        descriptor: RequestDescriptor,
        logger: Option<&dyn RequestLogger>,
    ) -> ClientResult<Value> {
        self.send(Method::Get, descriptor, logger).await
    }

    /// `send` with POST.
    pub async fn send_post(
        &self,
        descriptor: RequestDescriptor,
        logger: Option<&dyn RequestLogger>,
    ) -> ClientResult<Value> {
        self.send(Method::Post, descriptor, logger).await
    }
}
