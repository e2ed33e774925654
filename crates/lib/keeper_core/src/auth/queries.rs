//! Auth-related database queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use super::repository::{NewRefreshToken, TokenRepository, UserRepository};
use crate::models::auth::{RefreshTokenRecord, UserRecord};

const INSERT_REFRESH_TOKEN: &str = "INSERT INTO auth_refresh_tokens \
     (user_id, jti, token_hash, issued_at, expires_at) VALUES ($1, $2, $3, $4, $5)";

/// Postgres-backed [`UserRepository`].
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, login: &str, password_hash: &str) -> Result<i64, AuthError> {
        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (login, password_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(login)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(id) => Ok(id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AuthError::DuplicateLogin)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query_as::<_, (i64, String, String, DateTime<Utc>)>(
            "SELECT id, login, password_hash, created_at FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, login, password_hash, created_at)| UserRecord {
            id,
            login,
            password_hash,
            created_at,
        }))
    }
}

/// Postgres-backed [`TokenRepository`].
#[derive(Debug, Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type LedgerRow = (
    Uuid,
    i64,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<Uuid>,
    DateTime<Utc>,
);

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn create(&self, token: NewRefreshToken) -> Result<(), AuthError> {
        sqlx::query(INSERT_REFRESH_TOKEN)
            .bind(token.user_id)
            .bind(token.jti)
            .bind(&token.token_hash)
            .bind(token.issued_at)
            .bind(token.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rotate(&self, old_jti: Uuid, next: NewRefreshToken) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await?;

        // A concurrent rotation of the same row blocks here until the other
        // transaction commits, then sees `replaced_by` set and matches nothing.
        let updated = sqlx::query(
            "UPDATE auth_refresh_tokens SET replaced_by = $1 \
             WHERE jti = $2 AND user_id = $3 \
               AND replaced_by IS NULL \
               AND expires_at >= now()",
        )
        .bind(next.jti)
        .bind(old_jti)
        .bind(next.user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            // Dropping `tx` rolls back.
            return Err(AuthError::AlreadyRotatedOrExpired);
        }

        sqlx::query(INSERT_REFRESH_TOKEN)
            .bind(next.user_id)
            .bind(next.jti)
            .bind(&next.token_hash)
            .bind(next.issued_at)
            .bind(next.expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_by_jti(&self, jti: Uuid) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let row = sqlx::query_as::<_, LedgerRow>(
            "SELECT jti, user_id, token_hash, issued_at, expires_at, replaced_by, created_at \
             FROM auth_refresh_tokens WHERE jti = $1",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(jti, user_id, token_hash, issued_at, expires_at, replaced_by, created_at)| {
                RefreshTokenRecord {
                    jti,
                    user_id,
                    token_hash,
                    issued_at,
                    expires_at,
                    replaced_by,
                    created_at,
                }
            },
        ))
    }
}
