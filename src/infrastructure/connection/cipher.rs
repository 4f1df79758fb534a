//! AES-256-GCM cipher for credentials at rest

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::domain::connection::SecretCipher;
use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_CONTEXT: &[u8] = b"pmp-rag-backend/credentials";

/// Minimum decoded key length
pub const MIN_KEY_LEN: usize = 32;

/// AES-256-GCM with a random 96-bit nonce per value.
///
/// Stored form is URL-safe base64 of `nonce | ciphertext | tag`. The AES key
/// is HMAC-SHA256 of a fixed context under the configured key, so keys
/// longer than 32 bytes are accepted.
pub struct AesGcmSecretCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for AesGcmSecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmSecretCipher").finish_non_exhaustive()
    }
}

impl AesGcmSecretCipher {
    /// Build from a base64 key of at least 32 bytes
    pub fn from_base64_key(key: &str) -> Result<Self, DomainError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(DomainError::configuration(
                "security.encryption_key is not set; credentials cannot be stored",
            ));
        }

        let raw = STANDARD
            .decode(key)
            .or_else(|_| URL_SAFE_NO_PAD.decode(key))
            .map_err(|_| DomainError::configuration("security.encryption_key must be base64"))?;

        Self::from_bytes(&raw)
    }

    pub fn from_bytes(key: &[u8]) -> Result<Self, DomainError> {
        if key.len() < MIN_KEY_LEN {
            return Err(DomainError::configuration(format!(
                "Encryption key must be at least {} bytes, got {}",
                MIN_KEY_LEN,
                key.len()
            )));
        }

        let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
            .map_err(|e| DomainError::internal(format!("Invalid HMAC key: {}", e)))?;
        mac.update(KEY_CONTEXT);
        let derived = mac.finalize().into_bytes();

        let cipher = Aes256Gcm::new_from_slice(&derived)
            .map_err(|e| DomainError::internal(format!("Invalid AES key: {}", e)))?;
        Ok(Self { cipher })
    }
}

impl SecretCipher for AesGcmSecretCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, DomainError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| DomainError::credential("Encryption failed"))?;

        let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(output))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, DomainError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }

        let raw = URL_SAFE_NO_PAD
            .decode(ciphertext)
            .map_err(|_| DomainError::credential("Encrypted value is not valid base64"))?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(DomainError::credential("Encrypted value has an unknown format"));
        }

        let (nonce, body) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| DomainError::credential("Encrypted value failed authentication"))?;

        String::from_utf8(plaintext)
            .map_err(|_| DomainError::credential("Decrypted value is not valid UTF-8"))
    }
}
