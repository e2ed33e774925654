//! Register, login and refresh flows.
//!
//! Each successful register/login opens a refresh lineage: one ledger row per
//! issued refresh token. A refresh spends the presented token by rotating its
//! row, so a replayed token finds `replaced_by` set and is refused.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::AuthError;
use super::jwt::{IssuedRefreshToken, JwtManager, constant_time_eq, sha256_hex};
use super::password::PasswordHasher;
use super::repository::{NewRefreshToken, TokenRepository, UserRepository};
use crate::models::auth::{RefreshTokenRecord, Session, TokenPair};
use crate::validation;

/// Session orchestrator over the user store, ledger, hasher and token codec.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
    hasher: Arc<dyn PasswordHasher>,
    jwt: Arc<JwtManager>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        hasher: Arc<dyn PasswordHasher>,
        jwt: Arc<JwtManager>,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            jwt,
        }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    /// Create an account and open its first session.
    ///
    /// Not transactional: if issuing or persisting the refresh token fails,
    /// the user row stays and the caller can simply log in.
    pub async fn register(&self, login: &str, password: &str) -> Result<Session, AuthError> {
        validation::validate_login(login)?;
        validation::validate_password(password)?;

        let hash = self.hasher.hash_password(password)?;
        let user_id = self.users.create(login, &hash).await?;
        info!(user_id, "user registered");

        self.open_session(user_id).await
    }

    /// Check credentials and open a new session.
    ///
    /// An unknown login and a wrong password both yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn login(&self, login: &str, password: &str) -> Result<Session, AuthError> {
        validation::validate_login(login)?;

        let Some(user) = self.users.get_by_login(login).await? else {
            debug!("login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if !self.hasher.check_password_hash(password, &user.password_hash) {
            debug!(user_id = user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = user.id, "user logged in");
        self.open_session(user.id).await
    }

    /// Spend a refresh token and return a new access/refresh pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        validation::validate_refresh_token(refresh_token)?;

        let identity = self.jwt.parse_refresh_token(refresh_token).map_err(|e| {
            debug!(error = %e, "refresh token rejected by codec");
            AuthError::InvalidRefreshCredentials
        })?;

        let presented_hash = sha256_hex(refresh_token);
        let Some(record) = self.tokens.get_by_jti(identity.jti).await? else {
            warn!(user_id = identity.user_id, jti = %identity.jti, "refresh token not in ledger");
            return Err(AuthError::InvalidRefreshCredentials);
        };

        let now = Utc::now();
        if !check_refresh_record(now, identity.user_id, &presented_hash, &record) {
            if record.replaced_by.is_some() {
                warn!(user_id = record.user_id, jti = %record.jti, "refresh token replayed");
            } else {
                warn!(user_id = identity.user_id, jti = %record.jti, "stale or mismatched refresh token");
            }
            return Err(AuthError::InvalidRefreshCredentials);
        }

        let access_token = self.jwt.generate_access_token(identity.user_id)?;
        let issued = self.jwt.generate_refresh_token(identity.user_id)?;
        let next = ledger_entry(identity.user_id, &issued);

        self.tokens.rotate(identity.jti, next).await?;
        debug!(user_id = identity.user_id, old = %identity.jti, new = %issued.jti, "refresh token rotated");

        Ok(TokenPair {
            access_token,
            refresh_token: issued.token,
        })
    }

    async fn open_session(&self, user_id: i64) -> Result<Session, AuthError> {
        let access_token = self.jwt.generate_access_token(user_id)?;
        let issued = self.jwt.generate_refresh_token(user_id)?;
        self.tokens
            .create(ledger_entry(user_id, &issued))
            .await?;

        Ok(Session {
            user_id,
            access_token,
            refresh_token: issued.token,
        })
    }
}

fn ledger_entry(user_id: i64, issued: &IssuedRefreshToken) -> NewRefreshToken {
    NewRefreshToken {
        user_id,
        jti: issued.jti,
        token_hash: sha256_hex(&issued.token),
        issued_at: issued.issued_at,
        expires_at: issued.expires_at,
    }
}

/// Every check runs regardless of earlier failures so timing does not
/// reveal which one failed.
fn check_refresh_record(
    now: DateTime<Utc>,
    user_id: i64,
    presented_hash: &str,
    record: &RefreshTokenRecord,
) -> bool {
    let owner = record.user_id == user_id;
    let active = record.is_active(now);
    let hash_ok = constant_time_eq(presented_hash, &record.token_hash);
    owner & active & hash_ok
}
