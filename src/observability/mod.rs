//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher stages produce:
//!     → metrics.rs (API timer per call, request timer per attempt)
//!     → logging.rs (error records + single-line messages)
//!
//! Consumers:
//!     → Any TimerFactory (no-op by default, `metrics` histograms available)
//!     → Any RequestLogger (tracing events by default)
//! ```
//!
//! # Design Decisions
//! - Instrumentation never changes control flow
//! - Both interfaces are injected; nothing here is global except the optional
//!   tracing subscriber

pub mod logging;
pub mod metrics;

pub use logging::{ErrorRecord, ErrorScope, RequestLogger, TracingLogger};
pub use metrics::{
    HistogramTimerFactory, NoopTimerFactory, RequestLabels, ResponseLabels, Timer, TimerFactory,
};
