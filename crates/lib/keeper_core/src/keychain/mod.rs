//! Encrypted per-user secret storage.

pub mod queries;
pub mod repository;
pub mod service;

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::validation::ValidationError;

/// Keychain errors.
#[derive(Debug, Error)]
pub enum KeychainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("key not found")]
    NotFound,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("payload encoding: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
