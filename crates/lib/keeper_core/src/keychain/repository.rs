//! Storage seam for keychain entries.

use async_trait::async_trait;
use uuid::Uuid;

use super::KeychainError;
use crate::models::keychain::{KeyRecord, KeySummary, KeyType};

/// Per-user store of sealed secrets. Soft-deleted rows are invisible to
/// every read.
#[async_trait]
pub trait KeychainRepository: Send + Sync {
    /// Persist a sealed payload and return its new UUID.
    async fn add_key(
        &self,
        user_id: i64,
        key_type: KeyType,
        title: &str,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<Uuid, KeychainError>;

    async fn get_user_key(
        &self,
        user_id: i64,
        key_uuid: Uuid,
    ) -> Result<Option<KeyRecord>, KeychainError>;

    /// Newest first, optionally restricted to one kind.
    async fn get_user_keys(
        &self,
        user_id: i64,
        key_type: Option<KeyType>,
    ) -> Result<Vec<KeySummary>, KeychainError>;

    /// Soft delete. [`KeychainError::NotFound`] when there is no live row,
    /// including a second delete of the same key.
    async fn delete_key(&self, user_id: i64, key_uuid: Uuid) -> Result<(), KeychainError>;
}
