//! Request timing instrumentation.
//!
//! # Responsibilities
//! - Define the timer interface the dispatcher drives
//! - Provide a no-op default so call sites never branch
//! - Provide a `metrics` histogram implementation
//!
//! # Metrics
//! - `jwt_client_api_duration_seconds` (histogram): one sample per `send`
//! - `jwt_client_request_duration_seconds` (histogram): one sample per attempt
//!
//! # Design Decisions
//! - Request labels are fixed at start; response labels are added at stop
//! - `Timer::stop` consumes the timer, so a timer stops at most once

use std::time::Instant;

use metrics::Label;

use crate::error::ClientError;
use crate::transport::{TransportFailure, TransportResponse};

pub const API_DURATION_METRIC: &str = "jwt_client_api_duration_seconds";
pub const REQUEST_DURATION_METRIC: &str = "jwt_client_request_duration_seconds";

/// Labels known when a call starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLabels {
    pub client_name: String,
    pub base_url: String,
    /// The URL pattern, not the expanded URL, to keep cardinality bounded.
    pub url: String,
    pub method: String,
}

/// Labels known when a call or attempt ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseLabels {
    pub status_code: Option<u16>,
    pub status_message: Option<String>,
}

impl ResponseLabels {
    pub fn from_response(response: &TransportResponse) -> Self {
        Self {
            status_code: Some(response.status_code),
            status_message: response.status_message.clone(),
        }
    }

    pub fn from_failure(failure: &TransportFailure) -> Self {
        Self {
            status_code: failure.status_code,
            status_message: failure.status_message.clone(),
        }
    }

    /// Labels for a normalized error, keeping the failure's status message.
    pub fn from_error(err: &ClientError, status_message: Option<String>) -> Self {
        Self {
            status_code: Some(err.status_code()),
            status_message,
        }
    }
}

/// A running timer.
pub trait Timer: Send {
    fn stop(self: Box<Self>, labels: &ResponseLabels);
}

/// Starts timers; shared by all calls on a client.
pub trait TimerFactory: Send + Sync {
    fn start_timer(&self, labels: &RequestLabels) -> Box<dyn Timer>;
}

/// Factory whose timers record nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTimerFactory;

struct NoopTimer;

impl Timer for NoopTimer {
    fn stop(self: Box<Self>, _labels: &ResponseLabels) {}
}

impl TimerFactory for NoopTimerFactory {
    fn start_timer(&self, _labels: &RequestLabels) -> Box<dyn Timer> {
        Box::new(NoopTimer)
    }
}

/// Factory recording elapsed seconds into a `metrics` histogram.
#[derive(Debug, Clone)]
pub struct HistogramTimerFactory {
    name: String,
}

impl HistogramTimerFactory {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Histogram for whole calls.
    pub fn api() -> Self {
        Self::new(API_DURATION_METRIC)
    }

    /// Histogram for individual attempts.
    pub fn request() -> Self {
        Self::new(REQUEST_DURATION_METRIC)
    }
}

struct HistogramTimer {
    name: String,
    labels: RequestLabels,
    started: Instant,
}

impl Timer for HistogramTimer {
    fn stop(self: Box<Self>, response: &ResponseLabels) {
        let HistogramTimer {
            name,
            labels: request,
            started,
        } = *self;

        let mut labels = vec![
            Label::new("client_name", request.client_name),
            Label::new("base_url", request.base_url),
            Label::new("url", request.url),
            Label::new("method", request.method),
        ];
        if let Some(status) = response.status_code {
            labels.push(Label::new("status_code", status.to_string()));
        }
        if let Some(message) = &response.status_message {
            labels.push(Label::new("status_message", message.clone()));
        }

        metrics::histogram!(name, labels).record(started.elapsed().as_secs_f64());
    }
}

impl TimerFactory for HistogramTimerFactory {
    fn start_timer(&self, labels: &RequestLabels) -> Box<dyn Timer> {
        Box::new(HistogramTimer {
            name: self.name.clone(),
            labels: labels.clone(),
            started: Instant::now(),
        })
    }
}
