//! HTTP request/response shaping.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor
//!     → endpoint.rs (pattern + substitutions → absolute URL)
//!     → request.rs (token headers, query or body placement)
//!     → TransportRequest
//!
//! TransportResponse
//!     → response.rs (blank → {}, otherwise parsed JSON)
//! ```

pub mod endpoint;
pub mod request;
pub mod response;

pub use endpoint::{build_endpoint_url, Substitutions, TemplateError};
pub use request::{AccessTokens, Method, RequestDescriptor};
