//! AES-256 payload codec.
//!
//! # Responsibilities
//! - Encrypt and decrypt strings with a shared service key
//! - Derive a deterministic IV from a seed when one is supplied
//! - JSON-encode values before encryption, JSON-decode after decryption
//!
//! # Wire Format
//! ```text
//! base64( iv[16] || ciphertext || tag[16] )
//! ```
//!
//! # Design Decisions
//! - The 32-byte cipher key is the SHA-256 digest of the service key
//! - Seeded IVs are the first 16 bytes of SHA-256(seed), so the same
//!   (key, plaintext, seed) always produces the same string
//! - Unseeded IVs come from the thread-local CSPRNG
//! - Every decrypt failure collapses into `InvalidPayload`

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use base64::{engine::general_purpose, Engine as _};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// AES-256-GCM with a 16-byte IV.
type Cipher = AesGcm<Aes256, U16>;

/// IV length in bytes.
pub const IV_LEN: usize = 16;

const TAG_LEN: usize = 16;

/// Errors raised by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Key must be a non-empty string")]
    NoEncryptKey,

    #[error("Plaintext value must be a non-empty string")]
    NoEncryptValue,

    #[error("Key must be a non-empty string")]
    NoDecryptKey,

    #[error("Encrypted value must be a non-empty string")]
    NoDecryptValue,

    /// Malformed input, tampered ciphertext, wrong key or non-JSON plaintext.
    #[error("Invalid encrypted payload")]
    InvalidPayload,
}

impl CodecError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::NoEncryptKey => "ENOENCRYPTKEY",
            CodecError::NoEncryptValue => "ENOENCRYPTVALUE",
            CodecError::NoDecryptKey => "ENODECRYPTKEY",
            CodecError::NoDecryptValue => "ENODECRYPTVALUE",
            CodecError::InvalidPayload => "EINVALIDPAYLOAD",
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

fn derive_key(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

fn derive_iv(seed: Option<&str>) -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    match seed {
        Some(seed) => iv.copy_from_slice(&Sha256::digest(seed.as_bytes())[..IV_LEN]),
        None => rand::thread_rng().fill(&mut iv),
    }
    iv
}

/// Encrypt `plaintext` with `key`.
///
/// With `iv_seed` the output is deterministic; without it every call yields
/// a different string.
pub fn encrypt(key: &str, plaintext: &str, iv_seed: Option<&str>) -> CodecResult<String> {
    if key.is_empty() {
        return Err(CodecError::NoEncryptKey);
    }
    if plaintext.is_empty() {
        return Err(CodecError::NoEncryptValue);
    }

    let iv = derive_iv(iv_seed);
    let cipher = Cipher::new(&derive_key(key).into());
    let ciphertext = cipher
        .encrypt(Nonce::<U16>::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| CodecError::InvalidPayload)?;

    let mut combined = Vec::with_capacity(IV_LEN + ciphertext.len());
    combined.extend_from_slice(&iv);
    combined.extend_from_slice(&ciphertext);
    Ok(general_purpose::STANDARD.encode(combined))
}

/// Decrypt a string produced by [`encrypt`] with the same key.
pub fn decrypt(key: &str, encrypted: &str) -> CodecResult<String> {
    if key.is_empty() {
        return Err(CodecError::NoDecryptKey);
    }
    if encrypted.is_empty() {
        return Err(CodecError::NoDecryptValue);
    }

    let combined = general_purpose::STANDARD
        .decode(encrypted)
        .map_err(|_| CodecError::InvalidPayload)?;
    if combined.len() < IV_LEN + TAG_LEN {
        return Err(CodecError::InvalidPayload);
    }
    let (iv, ciphertext) = combined.split_at(IV_LEN);

    let cipher = Cipher::new(&derive_key(key).into());
    let plaintext = cipher
        .decrypt(Nonce::<U16>::from_slice(iv), ciphertext)
        .map_err(|_| CodecError::InvalidPayload)?;

    String::from_utf8(plaintext).map_err(|_| CodecError::InvalidPayload)
}

/// Serialize `value` as JSON and encrypt it.
pub fn encrypt_json<T: Serialize + ?Sized>(
    key: &str,
    value: &T,
    iv_seed: Option<&str>,
) -> CodecResult<String> {
    let plaintext = serde_json::to_string(value).map_err(|_| CodecError::NoEncryptValue)?;
    encrypt(key, &plaintext, iv_seed)
}

/// Decrypt and parse JSON. Non-JSON plaintext is an invalid payload.
pub fn decrypt_json<T: DeserializeOwned>(key: &str, encrypted: &str) -> CodecResult<T> {
    let plaintext = decrypt(key, encrypted)?;
    serde_json::from_str(&plaintext).map_err(|_| CodecError::InvalidPayload)
}
