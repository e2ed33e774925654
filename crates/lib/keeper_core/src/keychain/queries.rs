//! Keychain database queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::KeychainError;
use super::repository::KeychainRepository;
use crate::models::keychain::{KeyRecord, KeySummary, KeyType};
use crate::uuid::uuidv7;

/// Postgres-backed [`KeychainRepository`].
#[derive(Debug, Clone)]
pub struct PgKeychainRepository {
    pool: PgPool,
}

impl PgKeychainRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_type(raw: &str) -> Result<KeyType, KeychainError> {
    raw.parse()
        .map_err(|e| KeychainError::Internal(format!("stored row: {e}")))
}

type KeyRow = (
    i64,
    Uuid,
    i64,
    String,
    String,
    Vec<u8>,
    Vec<u8>,
    DateTime<Utc>,
    DateTime<Utc>,
);

type SummaryRow = (Uuid, String, String, DateTime<Utc>, DateTime<Utc>);

#[async_trait]
impl KeychainRepository for PgKeychainRepository {
    async fn add_key(
        &self,
        user_id: i64,
        key_type: KeyType,
        title: &str,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<Uuid, KeychainError> {
        let key_uuid = uuidv7();
        sqlx::query(
            "INSERT INTO keychain (key_uuid, user_id, type, title, data, nonce) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(key_uuid)
        .bind(user_id)
        .bind(key_type.as_str())
        .bind(title)
        .bind(ciphertext)
        .bind(nonce)
        .execute(&self.pool)
        .await?;
        Ok(key_uuid)
    }

    async fn get_user_key(
        &self,
        user_id: i64,
        key_uuid: Uuid,
    ) -> Result<Option<KeyRecord>, KeychainError> {
        let row = sqlx::query_as::<_, KeyRow>(
            "SELECT id, key_uuid, user_id, type, title, data, nonce, created_at, updated_at \
             FROM keychain \
             WHERE soft_deleted = false AND key_uuid = $1 AND user_id = $2",
        )
        .bind(key_uuid)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(
            |(id, key_uuid, user_id, key_type, title, ciphertext, nonce, created_at, updated_at)| {
                Ok(KeyRecord {
                    id,
                    key_uuid,
                    user_id,
                    key_type: parse_type(&key_type)?,
                    title,
                    ciphertext,
                    nonce,
                    created_at,
                    updated_at,
                })
            },
        )
        .transpose()
    }

    async fn get_user_keys(
        &self,
        user_id: i64,
        key_type: Option<KeyType>,
    ) -> Result<Vec<KeySummary>, KeychainError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT key_uuid, type, title, created_at, updated_at \
             FROM keychain \
             WHERE soft_deleted = false \
               AND user_id = $1 \
               AND ($2::text IS NULL OR type = $2) \
             ORDER BY created_at DESC, key_uuid DESC",
        )
        .bind(user_id)
        .bind(key_type.map(KeyType::as_str))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(key_uuid, key_type, title, created_at, updated_at)| {
                Ok(KeySummary {
                    key_uuid,
                    key_type: parse_type(&key_type)?,
                    title,
                    created_at,
                    updated_at,
                })
            })
            .collect()
    }

    async fn delete_key(&self, user_id: i64, key_uuid: Uuid) -> Result<(), KeychainError> {
        let result = sqlx::query(
            "UPDATE keychain SET soft_deleted = true, updated_at = now() \
             WHERE soft_deleted = false AND user_id = $1 AND key_uuid = $2",
        )
        .bind(user_id)
        .bind(key_uuid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(KeychainError::NotFound);
        }
        Ok(())
    }
}
