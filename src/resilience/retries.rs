//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a failed attempt is retryable (idempotent methods only)
//! - Enforce the per-call retry limit
//! - Compute the delay before the next attempt
//!
//! # Design Decisions
//! - Never retry POST (non-idempotent)
//! - Jittered backoff prevents thundering herd
//! - Connection-level codes and gateway/throttling statuses are retryable

use std::time::Duration;

use crate::http::Method;
use crate::resilience::backoff::calculate_backoff;
use crate::transport::{TransportFailure, TransportOptions};

/// Statuses worth another attempt.
pub const RETRYABLE_STATUSES: &[u16] = &[408, 413, 429, 500, 502, 503, 504, 521, 522, 524];

/// Network error codes worth another attempt.
pub const RETRYABLE_CODES: &[&str] = &[
    "ETIMEDOUT",
    "ECONNRESET",
    "EADDRINUSE",
    "ECONNREFUSED",
    "EPIPE",
    "ENOTFOUND",
    "ENETUNREACH",
    "EAI_AGAIN",
];

/// Retry decisions for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub limit: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_options(options: &TransportOptions) -> Self {
        Self {
            limit: options.retry_limit,
            base_delay: options.retry_base_delay,
            max_delay: options.retry_max_delay,
        }
    }

    /// Whether the failure is retryable at all, ignoring the limit.
    pub fn is_retryable(method: Method, failure: &TransportFailure) -> bool {
        if !method.is_idempotent() {
            return false;
        }
        if let Some(status) = failure.status_code {
            return RETRYABLE_STATUSES.contains(&status);
        }
        failure
            .code
            .as_deref()
            .is_some_and(|code| RETRYABLE_CODES.contains(&code))
    }

    /// Whether attempt `retry_count + 1` should follow this failure.
    pub fn should_retry(&self, method: Method, failure: &TransportFailure, retry_count: u32) -> bool {
        retry_count < self.limit && Self::is_retryable(method, failure)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        calculate_backoff(retry, self.base_delay, self.max_delay)
    }
}
