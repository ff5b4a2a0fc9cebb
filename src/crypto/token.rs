//! Access token issuing and verification.
//!
//! # Responsibilities
//! - Compute the payload checksum (SHA-256 hex of the canonical JSON)
//! - Sign `{checksum, iat, iss}` with the service token (HS256)
//! - Sign the same claims with an RSA private key (RS256) for the
//!   `x-access-token-v2` header
//! - Verify tokens on the receiving side
//!
//! # Design Decisions
//! - Payloads are hashed over [`canonical_json`], which sorts object keys at
//!   every depth, so objects that differ only in key order share a checksum
//!   whatever map ordering `serde_json` was built with
//! - Array order is still significant: `[1, 2]` and `[2, 1]` differ
//! - `iat` is always the signing time; there is no `exp` claim
//! - `iss` is the calling service's slug
//! - The token proves integrity and origin only; it is not encrypted

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Signing algorithm for `x-access-token`.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signing algorithm for `x-access-token-v2`.
pub const V2_ALGORITHM: Algorithm = Algorithm::RS256;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// SHA-256 hex digest of the request payload.
    pub checksum: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: u64,
    /// Slug of the issuing service.
    pub iss: String,
}

/// Errors raised while signing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("token verification failed: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),

    #[error("token checksum does not match payload")]
    ChecksumMismatch,

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // A string Value's Display is its escaped JSON literal.
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Checksum of a payload as it appears in the token.
pub fn checksum(payload: &Value) -> String {
    hex::encode(Sha256::digest(canonical_json(payload).as_bytes()))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn decode_base64_pem(encoded: &str) -> Result<Vec<u8>, TokenError> {
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| TokenError::InvalidKey(e.to_string()))
}

/// Signs access tokens on behalf of one service.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    algorithm: Algorithm,
    issuer: String,
}

impl TokenIssuer {
    /// HS256 issuer keyed with the shared service token.
    pub fn new(service_token: &str, issuer: impl Into<String>) -> Self {
        Self::with_key(EncodingKey::from_secret(service_token.as_bytes()), ALGORITHM, issuer)
    }

    pub fn with_key(key: EncodingKey, algorithm: Algorithm, issuer: impl Into<String>) -> Self {
        Self {
            key,
            algorithm,
            issuer: issuer.into(),
        }
    }

    /// RS256 issuer from a base64-encoded PEM private key (PKCS#1 or PKCS#8).
    pub fn from_encoded_private_key(
        encoded: &str,
        issuer: impl Into<String>,
    ) -> Result<Self, TokenError> {
        let pem = decode_base64_pem(encoded)?;
        let key =
            EncodingKey::from_rsa_pem(&pem).map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Ok(Self::with_key(key, V2_ALGORITHM, issuer))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a token for `payload`, stamped with the current time.
    pub fn issue(&self, payload: &Value) -> Result<String, TokenError> {
        let claims = AccessClaims {
            checksum: checksum(payload),
            iat: now_secs(),
            iss: self.issuer.clone(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.key).map_err(TokenError::Signing)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Checks tokens presented by a calling service.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    algorithm: Algorithm,
}

impl TokenVerifier {
    /// Verifier for `x-access-token`, keyed with the shared service token.
    pub fn from_secret(service_token: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(service_token.as_bytes()),
            algorithm: ALGORITHM,
        }
    }

    /// Verifier for `x-access-token-v2` from a PEM public key.
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, TokenError> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key,
            algorithm: V2_ALGORITHM,
        })
    }

    pub fn from_encoded_public_key(encoded: &str) -> Result<Self, TokenError> {
        Self::from_rsa_pem(&decode_base64_pem(encoded)?)
    }

    /// Verify `token` against the received `payload`.
    ///
    /// Rejects tokens signed with another key or algorithm and tokens whose
    /// checksum does not match the payload.
    pub fn verify(&self, token: &str, payload: &Value) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = decode::<AccessClaims>(token, &self.key, &validation)
            .map_err(TokenError::Verification)?;

        if data.claims.checksum != checksum(payload) {
            return Err(TokenError::ChecksumMismatch);
        }
        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::test_keys::{encoded_private_key, PUBLIC_KEY_PEM};
    use super::*;
    use base64::{engine::general_purpose, Engine as _};
    use serde_json::json;

    #[test]
    fn test_checksum_is_sha256_of_json() {
        let payload = json!({"data": "testData"});
        assert_eq!(
            checksum(&payload),
            "b5118e71a8ed3abbc8c40d4058b0dd54b9410ffd56ef888f602ed10026c46a3a"
        );
    }

    #[test]
    fn test_checksum_ignores_object_key_order() {
        let a: Value = serde_json::from_str(r#"{"a":1,"b":{"y":[1,{"q":1,"p":2}],"x":null}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b":{"x":null,"y":[1,{"p":2,"q":1}]},"a":1}"#).unwrap();
        assert_eq!(checksum(&a), checksum(&b));
    }

    #[test]
    fn test_checksum_respects_array_order() {
        assert_ne!(checksum(&json!([1, 2])), checksum(&json!([2, 1])));
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value: Value =
            serde_json::from_str(r#"{"b":{"d":1,"c":"x\"y"},"a":[{"f":true,"e":2.5}],"é":[]}"#)
                .unwrap();
        assert_eq!(
            canonical_json(&value),
            r#"{"a":[{"e":2.5,"f":true}],"b":{"c":"x\"y","d":1},"é":[]}"#
        );
        assert_eq!(canonical_json(&json!("plain")), r#""plain""#);
        assert_eq!(canonical_json(&json!({})), "{}");
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new("testServiceToken", "testServiceSlug");
        let payload = json!({"data": "testData"});
        let before = now_secs();

        let token = issuer.issue(&payload).unwrap();
        let claims = TokenVerifier::from_secret("testServiceToken")
            .verify(&token, &payload)
            .unwrap();

        assert_eq!(claims.checksum, checksum(&payload));
        assert_eq!(claims.iss, "testServiceSlug");
        assert!(claims.iat >= before && claims.iat <= now_secs());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let payload = json!({});
        let token = TokenIssuer::new("one", "slug").issue(&payload).unwrap();
        let result = TokenVerifier::from_secret("two").verify(&token, &payload);
        assert!(matches!(result, Err(TokenError::Verification(_))));
    }

    #[test]
    fn test_verify_rejects_other_payload() {
        let issuer = TokenIssuer::new("testServiceToken", "slug");
        let token = issuer.issue(&json!({"a": 1})).unwrap();
        let result = TokenVerifier::from_secret("testServiceToken").verify(&token, &json!({"a": 2}));
        assert!(matches!(result, Err(TokenError::ChecksumMismatch)));
    }

    #[test]
    fn test_rs256_issue_and_verify_with_public_key() {
        let issuer =
            TokenIssuer::from_encoded_private_key(&encoded_private_key(), "testServiceSlug").unwrap();
        assert_eq!(issuer.algorithm(), Algorithm::RS256);

        let payload = json!({"data": "testData"});
        let token = issuer.issue(&payload).unwrap();
        let claims = TokenVerifier::from_rsa_pem(PUBLIC_KEY_PEM.trim_start().as_bytes())
            .unwrap()
            .verify(&token, &payload)
            .unwrap();
        assert_eq!(claims.checksum, checksum(&payload));
        assert_eq!(claims.iss, "testServiceSlug");

        let encoded_public = general_purpose::STANDARD.encode(PUBLIC_KEY_PEM.trim_start());
        assert!(TokenVerifier::from_encoded_public_key(&encoded_public)
            .unwrap()
            .verify(&token, &payload)
            .is_ok());
    }

    #[test]
    fn test_rs256_token_is_not_accepted_as_hs256() {
        let issuer = TokenIssuer::from_encoded_private_key(&encoded_private_key(), "slug").unwrap();
        let token = issuer.issue(&json!({})).unwrap();
        let result = TokenVerifier::from_secret("testServiceToken").verify(&token, &json!({}));
        assert!(matches!(result, Err(TokenError::Verification(_))));
    }

    #[test]
    fn test_invalid_private_key_is_rejected() {
        let not_base64 = TokenIssuer::from_encoded_private_key("not base64!", "slug");
        assert!(matches!(not_base64, Err(TokenError::InvalidKey(_))));

        let not_pem = general_purpose::STANDARD.encode("hello");
        let result = TokenIssuer::from_encoded_private_key(&not_pem, "slug");
        assert!(matches!(result, Err(TokenError::InvalidKey(_))));
    }
}
