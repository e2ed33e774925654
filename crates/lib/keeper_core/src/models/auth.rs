//! Authentication domain models.
//!
//! These are internal domain models, distinct from the HTTP request/response
//! types in `keeper_api`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User row with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Refresh token ledger row. The raw token is never stored, only its
/// SHA-256 hex fingerprint.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub jti: Uuid,
    pub user_id: i64,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set exactly once, when this token is rotated.
    pub replaced_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Not yet rotated and not past its expiry.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.replaced_by.is_none() && now <= self.expires_at
    }
}

/// JWT claims shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user ID.
    pub sub: String,
    pub iss: String,
    pub aud: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Not before (unix timestamp).
    pub nbf: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Token ID. Keys the ledger row for refresh tokens.
    pub jti: String,
}

/// Tokens handed out by register/login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
}

/// Tokens handed out by a refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
