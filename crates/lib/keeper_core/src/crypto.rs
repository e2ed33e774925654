//! AES-256-GCM envelope encryption for keychain payloads.
//!
//! One process-wide 32-byte key. Each call to [`Envelope::encrypt`] draws a
//! fresh random 12-byte nonce; nonce and ciphertext (with its 16-byte tag)
//! are returned separately and must be stored together.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::RngCore;
use thiserror::Error;

/// Nonce size for AES-256-GCM (12 bytes).
pub const NONCE_SIZE: usize = 12;
/// AES-256 key size (32 bytes).
pub const KEY_SIZE: usize = 32;

/// Envelope errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid AEAD key length, expected 32 bytes")]
    KeyLengthInvalid,

    #[error("encryption failed")]
    EncryptionFailed,

    /// Wrong key, wrong nonce and tampered data are deliberately
    /// indistinguishable.
    #[error("message authentication failed")]
    AuthenticationFailed,
}

/// Output of a single seal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Authenticated symmetric encryption under a fixed 256-bit key.
#[derive(Clone)]
pub struct Envelope {
    cipher: Aes256Gcm,
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope").finish_non_exhaustive()
    }
}

impl Envelope {
    /// Build an envelope from raw key bytes. The key must be exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_SIZE {
            return Err(CryptoError::KeyLengthInvalid);
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::KeyLengthInvalid)?;
        Ok(Self { cipher })
    }

    /// Seal `plaintext` with a fresh random nonce and no associated data.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Sealed, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| {
                tracing::error!(len = plaintext.len(), "AEAD seal failed");
                CryptoError::EncryptionFailed
            })?;

        Ok(Sealed {
            nonce: nonce_bytes.to_vec(),
            ciphertext,
        })
    }

    /// Open a sealed payload. Any failure is reported as
    /// [`CryptoError::AuthenticationFailed`].
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != NONCE_SIZE {
            return Err(CryptoError::AuthenticationFailed);
        }
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}
