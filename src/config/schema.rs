//! Configuration schema definitions.
//!
//! This module defines the configuration structure for a client.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::TransportOptions;

/// Root configuration for a service client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Symmetric key for identity-pair encryption.
    pub service_secret: String,

    /// Symmetric key for signing access tokens.
    pub service_token: String,

    /// Slug identifying the calling service.
    pub service_slug: String,

    /// Base URL of the microservice to talk to.
    pub base_url: String,

    /// Name used in log and metric labels.
    pub client_name: Option<String>,

    /// Replacement for the default error name.
    pub error_name: Option<String>,

    /// Base64-encoded PEM RSA private key. When set, requests also carry
    /// an RS256 `x-access-token-v2` header.
    pub encoded_private_key: Option<String>,

    /// Transport defaults applied to every request.
    pub transport: TransportConfig,
}

/// Transport defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Retries after the first attempt (GET only).
    pub retry_limit: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_limit: 2,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 2000,
        }
    }
}

impl TransportConfig {
    pub fn to_options(&self) -> TransportOptions {
        TransportOptions {
            timeout: Some(Duration::from_secs(self.timeout_secs)),
            retry_limit: self.retry_limit,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            retry_max_delay: Duration::from_millis(self.retry_max_delay_ms),
            headers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            service_secret = "s"
            service_token = "t"
            service_slug = "slug"
            base_url = "https://microservice"
            "#,
        )
        .unwrap();
        assert_eq!(config.service_slug, "slug");
        assert!(config.client_name.is_none());
        assert!(config.encoded_private_key.is_none());
        assert_eq!(config.transport.retry_limit, 2);
    }

    #[test]
    fn test_transport_table() {
        let config: ClientConfig = toml::from_str(
            r#"
            [transport]
            timeout_secs = 5
            retry_limit = 0
            "#,
        )
        .unwrap();
        let options = config.transport.to_options();
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.retry_limit, 0);
        assert_eq!(options.retry_base_delay, Duration::from_millis(100));
        assert!(config.service_secret.is_empty());
    }
}
