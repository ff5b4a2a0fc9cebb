//! Service identity and identity-pair encryption.
//!
//! # Responsibilities
//! - Hold the immutable identity shared by every request of a client
//! - Reject missing identity fields in declared order
//! - Encrypt and decrypt `{userId, userToken}` pairs with the service secret
//!
//! # Design Decisions
//! - Identity-pair encryption is seeded with `user_id + user_token`, so the
//!   same pair always encrypts to the same string
//! - Any decrypt failure is reported as `EINVALIDPAYLOAD`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::aes256;
use crate::error::{ClientError, ClientResult};

/// Identity of the calling service. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    service_secret: String,
    service_token: String,
    service_slug: String,
    base_url: String,
}

impl ServiceIdentity {
    /// Build an identity; empty fields are missing and fail in declared order.
    pub fn new(
        service_secret: &str,
        service_token: &str,
        service_slug: &str,
        base_url: &str,
    ) -> ClientResult<Self> {
        if service_secret.is_empty() {
            return Err(ClientError::configuration(
                "ENOSERVICESECRET",
                "No service secret passed to client",
            ));
        }
        if service_token.is_empty() {
            return Err(ClientError::configuration(
                "ENOSERVICETOKEN",
                "No service token passed to client",
            ));
        }
        if service_slug.is_empty() {
            return Err(ClientError::configuration(
                "ENOSERVICESLUG",
                "No service slug passed to client",
            ));
        }
        if base_url.is_empty() {
            return Err(ClientError::configuration(
                "ENOMICROSERVICEURL",
                "No microservice url passed to client",
            ));
        }

        Ok(Self {
            service_secret: service_secret.to_string(),
            service_token: service_token.to_string(),
            service_slug: service_slug.to_string(),
            base_url: base_url.to_string(),
        })
    }

    pub fn service_secret(&self) -> &str {
        &self.service_secret
    }

    pub fn service_token(&self) -> &str {
        &self.service_token
    }

    pub fn service_slug(&self) -> &str {
        &self.service_slug
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceIdentity")
            .field("service_slug", &self.service_slug)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// A user's ID and token, exchanged between services sharing a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPair {
    pub user_id: String,
    pub user_token: String,
}

impl IdentityPair {
    pub fn new(user_id: impl Into<String>, user_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_token: user_token.into(),
        }
    }

    /// IV seed for deterministic encryption.
    pub fn iv_seed(&self) -> String {
        format!("{}{}", self.user_id, self.user_token)
    }
}

/// Identity-pair encryption with a service secret.
#[derive(Clone)]
pub struct IdentityCipher {
    secret: String,
}

impl IdentityCipher {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Encrypt a user's ID and token. Same input, same output.
    pub fn encrypt_user_id_and_token(&self, user_id: &str, user_token: &str) -> ClientResult<String> {
        let pair = IdentityPair::new(user_id, user_token);
        aes256::encrypt_json(&self.secret, &pair, Some(&pair.iv_seed()))
            .map_err(|e| ClientError::configuration(e.code(), e.to_string()))
    }

    /// Decrypt a string produced by [`Self::encrypt_user_id_and_token`].
    pub fn decrypt_user_id_and_token(&self, encrypted: &str) -> ClientResult<IdentityPair> {
        aes256::decrypt_json(&self.secret, encrypted).map_err(|_| ClientError::invalid_payload())
    }
}

impl fmt::Debug for IdentityCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCipher").finish_non_exhaustive()
    }
}
