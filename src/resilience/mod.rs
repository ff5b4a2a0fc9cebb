//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt fails inside the transport:
//!     → retries.rs (method idempotent? status/code retryable? under limit?)
//!     → backoff.rs (jittered exponential delay)
//!     → next attempt
//! ```
//!
//! # Design Decisions
//! - Retry belongs to the transport; the dispatcher only observes attempts
//! - Retries only for idempotent requests (GET)
//! - Limits and delays come from per-call `TransportOptions`

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
