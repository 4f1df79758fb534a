//! Credential encryption seam

use std::fmt::Debug;

use crate::domain::DomainError;

/// Symmetric encryption for credentials stored at rest.
///
/// Implementations receive their key at construction time; there is no
/// process-wide key.
pub trait SecretCipher: Send + Sync + Debug {
    fn encrypt(&self, plaintext: &str) -> Result<String, DomainError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, DomainError>;
}
