//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, backoff bounds ordered)
//! - Check that the base URL is an absolute http(s) URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Missing identity fields are left to client construction, which reports
//!   them one at a time in declared order

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("base_url '{url}' is not a valid URL: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("base_url '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("transport.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("transport.retry_max_delay_ms ({max}) is below retry_base_delay_ms ({base})")]
    BackoffBounds { base: u64, max: u64 },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.base_url.is_empty() {
        match Url::parse(&config.base_url) {
            Ok(url) if !matches!(url.scheme(), "http" | "https") => {
                errors.push(ValidationError::UnsupportedScheme(config.base_url.clone()));
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: e.to_string(),
            }),
        }
    }

    let transport = &config.transport;
    if transport.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if transport.retry_max_delay_ms < transport.retry_base_delay_ms {
        errors.push(ValidationError::BackoffBounds {
            base: transport.retry_base_delay_ms,
            max: transport.retry_max_delay_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
