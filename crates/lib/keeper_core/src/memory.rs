//! In-memory repositories.
//!
//! Same contracts as the Postgres implementations, including atomic
//! rotation and soft delete. Used by unit tests here and by the HTTP tests
//! in `keeper_api`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::auth::repository::{NewRefreshToken, TokenRepository, UserRepository};
use crate::keychain::KeychainError;
use crate::keychain::repository::KeychainRepository;
use crate::models::auth::{RefreshTokenRecord, UserRecord};
use crate::models::keychain::{KeyRecord, KeySummary, KeyType};
use crate::uuid::uuidv7;

/// Users keyed by login.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: DashMap<String, UserRecord>,
    next_id: AtomicI64,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, login: &str, password_hash: &str) -> Result<i64, AuthError> {
        match self.users.entry(login.to_string()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateLogin),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(UserRecord {
                    id,
                    login: login.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: Utc::now(),
                });
                Ok(id)
            }
        }
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(login).map(|u| u.clone()))
    }
}

/// Refresh-token ledger. One lock covers check-and-insert during rotation.
#[derive(Debug, Default)]
pub struct MemoryTokenRepository {
    rows: Mutex<HashMap<Uuid, RefreshTokenRecord>>,
}

impl MemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw record, e.g. one that is already expired.
    pub fn insert_record(&self, record: RefreshTokenRecord) {
        self.rows().insert(record.jti, record);
    }

    /// Snapshot of every ledger row.
    pub fn records(&self) -> Vec<RefreshTokenRecord> {
        self.rows().values().cloned().collect()
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<Uuid, RefreshTokenRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ledger_row(token: NewRefreshToken) -> RefreshTokenRecord {
    RefreshTokenRecord {
        jti: token.jti,
        user_id: token.user_id,
        token_hash: token.token_hash,
        issued_at: token.issued_at,
        expires_at: token.expires_at,
        replaced_by: None,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn create(&self, token: NewRefreshToken) -> Result<(), AuthError> {
        let mut rows = self.rows();
        if rows.contains_key(&token.jti) {
            return Err(AuthError::Internal(format!("duplicate jti {}", token.jti)));
        }
        rows.insert(token.jti, ledger_row(token));
        Ok(())
    }

    async fn rotate(&self, old_jti: Uuid, next: NewRefreshToken) -> Result<(), AuthError> {
        let now = Utc::now();
        let mut rows = self.rows();
        match rows.get_mut(&old_jti) {
            Some(old)
                if old.user_id == next.user_id
                    && old.replaced_by.is_none()
                    && old.expires_at >= now =>
            {
                old.replaced_by = Some(next.jti);
            }
            _ => return Err(AuthError::AlreadyRotatedOrExpired),
        }
        rows.insert(next.jti, ledger_row(next));
        Ok(())
    }

    async fn get_by_jti(&self, jti: Uuid) -> Result<Option<RefreshTokenRecord>, AuthError> {
        Ok(self.rows().get(&jti).cloned())
    }
}

#[derive(Debug)]
struct StoredKey {
    record: KeyRecord,
    soft_deleted: bool,
}

/// Keychain entries keyed by UUID.
#[derive(Debug, Default)]
pub struct MemoryKeychainRepository {
    keys: DashMap<Uuid, StoredKey>,
    next_id: AtomicI64,
}

impl MemoryKeychainRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, soft-deleted ones included.
    pub fn stored_len(&self) -> usize {
        self.keys.len()
    }
}

#[async_trait]
impl KeychainRepository for MemoryKeychainRepository {
    async fn add_key(
        &self,
        user_id: i64,
        key_type: KeyType,
        title: &str,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<Uuid, KeychainError> {
        let now = Utc::now();
        let key_uuid = uuidv7();
        let record = KeyRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            key_uuid,
            user_id,
            key_type,
            title: title.to_string(),
            ciphertext: ciphertext.to_vec(),
            nonce: nonce.to_vec(),
            created_at: now,
            updated_at: now,
        };
        self.keys.insert(
            key_uuid,
            StoredKey {
                record,
                soft_deleted: false,
            },
        );
        Ok(key_uuid)
    }

    async fn get_user_key(
        &self,
        user_id: i64,
        key_uuid: Uuid,
    ) -> Result<Option<KeyRecord>, KeychainError> {
        Ok(self
            .keys
            .get(&key_uuid)
            .filter(|k| !k.soft_deleted && k.record.user_id == user_id)
            .map(|k| k.record.clone()))
    }

    async fn get_user_keys(
        &self,
        user_id: i64,
        key_type: Option<KeyType>,
    ) -> Result<Vec<KeySummary>, KeychainError> {
        let mut keys: Vec<KeySummary> = self
            .keys
            .iter()
            .filter(|k| !k.soft_deleted && k.record.user_id == user_id)
            .filter(|k| key_type.is_none_or(|t| k.record.key_type == t))
            .map(|k| KeySummary::from(&k.record))
            .collect();
        keys.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.key_uuid.cmp(&a.key_uuid))
        });
        Ok(keys)
    }

    async fn delete_key(&self, user_id: i64, key_uuid: Uuid) -> Result<(), KeychainError> {
        match self.keys.get_mut(&key_uuid) {
            Some(mut k) if !k.soft_deleted && k.record.user_id == user_id => {
                k.soft_deleted = true;
                k.record.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(KeychainError::NotFound),
        }
    }
}
