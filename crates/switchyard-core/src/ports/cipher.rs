//! Symmetric cipher port for secret values.

use thiserror::Error;

use crate::domain::SecretValue;

/// Errors from the cipher. Messages never contain plaintext.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CipherError {
    /// No master key is configured.
    #[error("Secret store is locked: no master key configured")]
    Locked,

    #[error("Encryption failed: {0}")]
    Encrypt(String),

    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("Invalid master key: {0}")]
    InvalidKey(String),
}

/// Encrypts and decrypts single secret values.
///
/// `encrypt` must be all-or-nothing: it either returns the complete
/// ciphertext or an error.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CipherError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecretValue, CipherError>;
}

/// Cipher used when no master key is available. Every call fails with
/// [`CipherError::Locked`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LockedCipher;

impl SecretCipher for LockedCipher {
    fn encrypt(&self, _plaintext: &str) -> Result<Vec<u8>, CipherError> {
        Err(CipherError::Locked)
    }

    fn decrypt(&self, _ciphertext: &[u8]) -> Result<SecretValue, CipherError> {
        Err(CipherError::Locked)
    }
}
