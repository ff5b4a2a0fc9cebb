//! Service client.
//!
//! # Data Flow
//! ```text
//! ClientBuilder / ClientConfig
//!     → ServiceIdentity (fail fast: secret, token, slug, url)
//!     → JwtClient
//!         → send(method, descriptor, logger)  (dispatcher.rs)
//!         → identity_cipher()                 (identity.rs)
//! ```
//!
//! # Design Decisions
//! - One client type; identity-pair encryption is a capability handed out
//!   on demand rather than a separate client flavour
//! - Every error leaving the client passes through `finish`, which applies
//!   the configured error name and mapper exactly once
//! - Cloning a client is cheap; clones share identity, transport and timers
//! - An RSA private key is optional; without one no v2 token is issued

mod dispatcher;
pub mod identity;

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, EncodingKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::crypto::{aes256, TokenIssuer};
use crate::error::{ClientError, ClientResult, ErrorKind, ErrorMapper};
use crate::http::{build_endpoint_url, AccessTokens, Substitutions};
use crate::observability::{NoopTimerFactory, TimerFactory};
use crate::transport::{ReqwestTransport, Transport, TransportOptions};

pub use identity::{IdentityCipher, IdentityPair, ServiceIdentity};

/// Client name used in labels when none is configured.
pub const DEFAULT_CLIENT_NAME: &str = "JwtClient";

/// Client for one microservice, authenticated with a service identity.
#[derive(Clone)]
pub struct JwtClient {
    identity: Arc<ServiceIdentity>,
    issuer: TokenIssuer,
    issuer_v2: Option<TokenIssuer>,
    transport: Arc<dyn Transport>,
    api_metrics: Arc<dyn TimerFactory>,
    request_metrics: Arc<dyn TimerFactory>,
    client_name: String,
    error_name: Option<String>,
    error_mapper: Option<ErrorMapper>,
    default_options: TransportOptions,
}

impl JwtClient {
    /// Build a client with the default transport and no-op timers.
    pub fn new(
        service_secret: &str,
        service_token: &str,
        service_slug: &str,
        base_url: &str,
    ) -> ClientResult<Self> {
        Self::builder()
            .service_secret(service_secret)
            .service_token(service_token)
            .service_slug(service_slug)
            .base_url(base_url)
            .build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Replace the API-level and transport-level timer factories.
    pub fn set_metrics_instrumentation(
        &mut self,
        api_metrics: Arc<dyn TimerFactory>,
        request_metrics: Arc<dyn TimerFactory>,
    ) {
        self.api_metrics = api_metrics;
        self.request_metrics = request_metrics;
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Absolute URL for `pattern` on this client's base URL.
    pub fn create_endpoint_url(
        &self,
        pattern: &str,
        substitutions: &Substitutions,
    ) -> ClientResult<String> {
        build_endpoint_url(self.identity.base_url(), pattern, substitutions)
            .map_err(|e| self.finish(e.into()))
    }

    /// Signed access token for `payload`.
    pub fn generate_access_token(&self, payload: &Value) -> ClientResult<String> {
        self.sign(&self.issuer, payload)
    }

    /// RS256 access token for `payload`; `None` without a private key.
    pub fn generate_access_token_v2(&self, payload: &Value) -> ClientResult<Option<String>> {
        self.issuer_v2
            .as_ref()
            .map(|issuer| self.sign(issuer, payload))
            .transpose()
    }

    /// Access token for `payload` signed with an arbitrary key and algorithm.
    pub fn generate_access_token_with(
        &self,
        payload: &Value,
        key: &EncodingKey,
        algorithm: Algorithm,
    ) -> ClientResult<String> {
        let issuer = TokenIssuer::with_key(key.clone(), algorithm, self.identity.service_slug());
        self.sign(&issuer, payload)
    }

    /// Every token a request for `payload` carries.
    pub fn generate_access_tokens(&self, payload: &Value) -> ClientResult<AccessTokens> {
        let tokens = AccessTokens::new(self.generate_access_token(payload)?);
        Ok(match self.generate_access_token_v2(payload)? {
            Some(token_v2) => tokens.with_v2(token_v2),
            None => tokens,
        })
    }

    fn sign(&self, issuer: &TokenIssuer, payload: &Value) -> ClientResult<String> {
        issuer.issue(payload).map_err(|e| {
            self.finish(ClientError::new(
                ErrorKind::Configuration,
                500,
                "ETOKENSIGN",
                e.to_string(),
            ))
        })
    }

    /// Encrypt any serializable value with `key`.
    pub fn encrypt<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        iv_seed: Option<&str>,
    ) -> ClientResult<String> {
        aes256::encrypt_json(key, value, iv_seed)
            .map_err(|e| self.finish(ClientError::configuration(e.code(), e.to_string())))
    }

    /// Decrypt a value produced by [`Self::encrypt`] with the same key.
    pub fn decrypt<T: DeserializeOwned>(&self, key: &str, encrypted: &str) -> ClientResult<T> {
        aes256::decrypt_json(key, encrypted).map_err(|_| self.finish(ClientError::invalid_payload()))
    }

    /// Identity-pair encryption keyed with this client's service secret.
    pub fn identity_cipher(&self) -> IdentityCipher {
        IdentityCipher::new(self.identity.service_secret())
    }

    pub fn encrypt_user_id_and_token(&self, user_id: &str, user_token: &str) -> ClientResult<String> {
        self.identity_cipher()
            .encrypt_user_id_and_token(user_id, user_token)
            .map_err(|e| self.finish(e))
    }

    pub fn decrypt_user_id_and_token(&self, encrypted: &str) -> ClientResult<IdentityPair> {
        self.identity_cipher()
            .decrypt_user_id_and_token(encrypted)
            .map_err(|e| self.finish(e))
    }

    /// Apply the configured error name and mapper.
    fn finish(&self, err: ClientError) -> ClientError {
        apply_error_policy(err, self.error_name.as_deref(), self.error_mapper.as_ref())
    }
}

impl fmt::Debug for JwtClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtClient")
            .field("client_name", &self.client_name)
            .field("identity", &self.identity)
            .field("error_name", &self.error_name)
            .field("default_options", &self.default_options)
            .finish_non_exhaustive()
    }
}

fn apply_error_policy(
    err: ClientError,
    error_name: Option<&str>,
    error_mapper: Option<&ErrorMapper>,
) -> ClientError {
    let err = match error_name {
        Some(name) => err.with_name(name.to_string()),
        None => err,
    };
    match error_mapper {
        Some(mapper) => mapper(err),
        None => err,
    }
}

/// Builder for [`JwtClient`].
#[derive(Default)]
pub struct ClientBuilder {
    service_secret: Option<String>,
    service_token: Option<String>,
    service_slug: Option<String>,
    base_url: Option<String>,
    client_name: Option<String>,
    error_name: Option<String>,
    error_mapper: Option<ErrorMapper>,
    encoded_private_key: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    api_metrics: Option<Arc<dyn TimerFactory>>,
    request_metrics: Option<Arc<dyn TimerFactory>>,
    default_options: Option<TransportOptions>,
}

impl ClientBuilder {
    /// Start from a loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            service_secret: Some(config.service_secret.clone()),
            service_token: Some(config.service_token.clone()),
            service_slug: Some(config.service_slug.clone()),
            base_url: Some(config.base_url.clone()),
            client_name: config.client_name.clone(),
            error_name: config.error_name.clone(),
            encoded_private_key: config.encoded_private_key.clone(),
            default_options: Some(config.transport.to_options()),
            ..Default::default()
        }
    }

    pub fn service_secret(mut self, secret: impl Into<String>) -> Self {
        self.service_secret = Some(secret.into());
        self
    }

    pub fn service_token(mut self, token: impl Into<String>) -> Self {
        self.service_token = Some(token.into());
        self
    }

    pub fn service_slug(mut self, slug: impl Into<String>) -> Self {
        self.service_slug = Some(slug.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Name used in metric and log labels.
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Name given to every error this client raises.
    pub fn error_name(mut self, name: impl Into<String>) -> Self {
        self.error_name = Some(name.into());
        self
    }

    /// Transformation applied to every error this client raises.
    ///
    /// The result is still a [`ClientError`]; see [`ErrorMapper`] for
    /// converting into a caller-defined type.
    pub fn error_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(ClientError) -> ClientError + Send + Sync + 'static,
    {
        self.error_mapper = Some(Arc::new(mapper));
        self
    }

    /// Base64-encoded PEM RSA private key for `x-access-token-v2`.
    pub fn encoded_private_key(mut self, key: impl Into<String>) -> Self {
        self.encoded_private_key = Some(key.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn metrics(
        mut self,
        api_metrics: Arc<dyn TimerFactory>,
        request_metrics: Arc<dyn TimerFactory>,
    ) -> Self {
        self.api_metrics = Some(api_metrics);
        self.request_metrics = Some(request_metrics);
        self
    }

    /// Options used when a request carries none of its own.
    pub fn default_options(mut self, options: TransportOptions) -> Self {
        self.default_options = Some(options);
        self
    }

    pub fn build(self) -> ClientResult<JwtClient> {
        let identity = ServiceIdentity::new(
            self.service_secret.as_deref().unwrap_or_default(),
            self.service_token.as_deref().unwrap_or_default(),
            self.service_slug.as_deref().unwrap_or_default(),
            self.base_url.as_deref().unwrap_or_default(),
        )
        .map_err(|e| apply_error_policy(e, self.error_name.as_deref(), self.error_mapper.as_ref()))?;

        let issuer_v2 = match self.encoded_private_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                let issuer = TokenIssuer::from_encoded_private_key(key, identity.service_slug())
                    .map_err(|e| {
                        apply_error_policy(
                            ClientError::configuration("EINVALIDPRIVATEKEY", e.to_string()),
                            self.error_name.as_deref(),
                            self.error_mapper.as_ref(),
                        )
                    })?;
                Some(issuer)
            }
            _ => None,
        };

        let client_name = self
            .client_name
            .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string());
        tracing::debug!(
            client_name = %client_name,
            base_url = %identity.base_url(),
            service_slug = %identity.service_slug(),
            token_v2 = issuer_v2.is_some(),
            "Client constructed"
        );

        Ok(JwtClient {
            issuer: TokenIssuer::new(identity.service_token(), identity.service_slug()),
            issuer_v2,
            identity: Arc::new(identity),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ReqwestTransport::new())),
            api_metrics: self
                .api_metrics
                .unwrap_or_else(|| Arc::new(NoopTimerFactory)),
            request_metrics: self
                .request_metrics
                .unwrap_or_else(|| Arc::new(NoopTimerFactory)),
            client_name,
            error_name: self.error_name,
            error_mapper: self.error_mapper,
            default_options: self.default_options.unwrap_or_default(),
        })
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("service_slug", &self.service_slug)
            .field("base_url", &self.base_url)
            .field("client_name", &self.client_name)
            .finish_non_exhaustive()
    }
}
