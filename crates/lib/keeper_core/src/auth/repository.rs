//! Storage seams for users and the refresh-token ledger.
//!
//! Postgres implementations live in [`super::queries`]; in-memory ones in
//! `crate::memory` (feature `test-support`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{RefreshTokenRecord, UserRecord};

/// User store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user and return its ID. A taken login yields
    /// [`AuthError::DuplicateLogin`].
    async fn create(&self, login: &str, password_hash: &str) -> Result<i64, AuthError>;

    async fn get_by_login(&self, login: &str) -> Result<Option<UserRecord>, AuthError>;
}

/// A ledger row about to be written.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: i64,
    pub jti: Uuid,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Append-only refresh-token ledger, keyed by `jti`.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn create(&self, token: NewRefreshToken) -> Result<(), AuthError>;

    /// Atomically mark `old_jti` as replaced by `next.jti` and insert `next`.
    ///
    /// The old row is only updated while it belongs to `next.user_id`, is not
    /// yet replaced and has not expired. If no row qualifies nothing is
    /// written and [`AuthError::AlreadyRotatedOrExpired`] is returned, so at
    /// most one of several concurrent rotations of the same token succeeds.
    async fn rotate(&self, old_jti: Uuid, next: NewRefreshToken) -> Result<(), AuthError>;

    async fn get_by_jti(&self, jti: Uuid) -> Result<Option<RefreshTokenRecord>, AuthError>;
}
