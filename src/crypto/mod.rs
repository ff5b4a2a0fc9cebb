//! Cryptographic subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     payload → token.rs (checksum + HS256 signature) → x-access-token header
//!     payload → token.rs (checksum + RS256 signature) → x-access-token-v2 header
//!                                                       (private key configured)
//!
//! Identity pairs only:
//!     {userId, userToken} → aes256.rs (seeded IV) → opaque string
//!     opaque string → aes256.rs → {userId, userToken}
//! ```
//!
//! # Design Decisions
//! - Signing and encryption use different keys (service token or private
//!   key for signing, secret for encryption)
//! - Neither module holds state beyond the key it is given

pub mod aes256;
pub mod token;

pub use aes256::{CodecError, CodecResult};
pub use token::{AccessClaims, TokenError, TokenIssuer, TokenVerifier};
