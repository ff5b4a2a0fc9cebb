//! Service-to-service HTTP client with signed requests.
//!
//! Every request carries an `x-access-token` header: an HS256 token whose
//! claims bind a checksum of the request payload. With an RSA private key
//! configured, `x-access-token-v2` carries the same claims signed RS256.
//! Two services sharing a secret can also exchange `{userId, userToken}`
//! pairs encrypted with AES-256.
//!
//! ```no_run
//! use service_jwt_client::{JwtClient, RequestDescriptor, TracingLogger};
//!
//! # async fn run() -> Result<(), service_jwt_client::ClientError> {
//! let client = JwtClient::new("secret", "token", "submitter", "https://submitter.local")?;
//! let submission = client
//!     .send_get(
//!         RequestDescriptor::new("/submission/:submissionId").substitution("submissionId", "abc"),
//!         Some(&TracingLogger),
//!     )
//!     .await?;
//! # let _ = submission;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod http;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use client::{ClientBuilder, IdentityCipher, IdentityPair, JwtClient, ServiceIdentity};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ErrorCode, ErrorKind};
pub use http::{Method, RequestDescriptor, Substitutions};
pub use observability::{RequestLogger, TimerFactory, TracingLogger};
pub use transport::{Transport, TransportOptions};
