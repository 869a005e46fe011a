//! AES-256-GCM implementation of the `SecretCipher` port.
//!
//! The 256-bit key is derived from the operator's master key with
//! PBKDF2-HMAC-SHA256 over a fixed salt, so the same master key always opens
//! the same store. Every value gets a fresh random 96-bit nonce and is
//! stored as `nonce || ciphertext || tag`.

#![deny(unsafe_code)]

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use rand::RngCore;
use sha2::Sha256;

use switchyard_core::{CipherError, SecretCipher, SecretValue};

/// Length of the random nonce prefixed to every ciphertext.
pub const NONCE_LEN: usize = 12;

/// PBKDF2 rounds used to stretch the master key.
pub const KDF_ITERATIONS: u32 = 100_000;

const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const KDF_SALT: &[u8] = b"switchyard-secret-store";

/// Cipher keyed from a master key string.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// Derive the encryption key from `master_key`.
    ///
    /// Fails with [`CipherError::InvalidKey`] for a blank master key.
    pub fn from_master_key(master_key: &str) -> Result<Self, CipherError> {
        if master_key.trim().is_empty() {
            return Err(CipherError::InvalidKey("master key is empty".to_string()));
        }

        let mut key = derive_key(master_key);
        let cipher = Aes256Gcm::new_from_slice(&key);
        wipe(&mut key);
        let cipher = cipher.map_err(|e| CipherError::InvalidKey(e.to_string()))?;

        tracing::debug!(iterations = KDF_ITERATIONS, "Derived secret store key");
        Ok(Self { cipher })
    }
}

fn derive_key(master_key: &str) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(master_key.as_bytes(), KDF_SALT, KDF_ITERATIONS, &mut key);
    key
}

/// Overwrite derived key material once the cipher owns its schedule.
fn wipe(key: &mut [u8; KEY_LEN]) {
    key.fill(0);
    // Keep the store from being elided as dead.
    std::hint::black_box(key);
}

impl fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmCipher").finish_non_exhaustive()
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::Encrypt(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecretValue, CipherError> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::Decrypt(format!(
                "ciphertext too short ({} bytes)",
                ciphertext.len()
            )));
        }

        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::Decrypt("authentication failed".to_string()))?;

        String::from_utf8(plain)
            .map(SecretValue::new)
            .map_err(|e| CipherError::Decrypt(format!("invalid UTF-8: {e}")))
    }
}

/// A fresh random master key: 32 bytes, base64 encoded.
pub fn generate_master_key() -> String {
    let mut bytes = [0u8; KEY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
