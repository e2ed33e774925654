//! JWT access/refresh token generation and verification.
//!
//! Both kinds are HS256 with the same claim shape but separate secrets and
//! lifetimes. Refresh tokens carry a `jti` that keys their ledger row.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::TokenClaims;

/// Minimum HMAC secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Clock-skew tolerance: `nbf` is backdated by this much and every time
/// check gets the same leeway.
const CLOCK_SKEW_SECS: i64 = 30;

/// Upper bound for the access-token lifetime.
pub const MAX_ACCESS_TTL_MINUTES: i64 = 24 * 60;
/// Upper bound for the refresh-token lifetime.
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;

/// Token codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("secret too short, expected at least 32 bytes")]
    SecretTooShort,

    #[error("expired or invalid access token")]
    ExpiredOrInvalid,

    #[error("invalid access token subject")]
    InvalidSubject,

    #[error("expired or invalid refresh token")]
    RefreshExpiredOrInvalid,

    #[error("invalid refresh token claims")]
    InvalidClaims,

    #[error("token lifetime out of range")]
    InvalidTtl,

    #[error("jwt encode: {0}")]
    Encode(String),
}

/// Signing configuration for both token kinds.
#[derive(Clone)]
pub struct JwtSettings {
    pub issuer: String,
    pub audience: String,
    pub access_secret: String,
    pub access_ttl: Duration,
    pub refresh_secret: String,
    pub refresh_ttl: Duration,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// A freshly signed refresh token and the values the ledger needs.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub jti: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Identity carried by a verified refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshIdentity {
    pub user_id: i64,
    pub jti: Uuid,
}

/// Issues and verifies access and refresh tokens.
#[derive(Debug, Clone)]
pub struct JwtManager {
    settings: JwtSettings,
}

impl JwtManager {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    /// Check both secrets up front so a misconfigured server fails at startup
    /// rather than on the first login.
    pub fn validate_secrets(&self) -> Result<(), TokenError> {
        check_secret(&self.settings.access_secret)?;
        check_secret(&self.settings.refresh_secret)
    }

    /// Check both lifetimes are positive and within their upper bounds.
    pub fn validate_ttls(&self) -> Result<(), TokenError> {
        check_ttl(
            self.settings.access_ttl,
            Duration::minutes(MAX_ACCESS_TTL_MINUTES),
        )?;
        check_ttl(
            self.settings.refresh_ttl,
            Duration::days(MAX_REFRESH_TTL_DAYS),
        )
    }

    /// Sign a short-lived access token for `user_id`.
    pub fn generate_access_token(&self, user_id: i64) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = expiry(now, self.settings.access_ttl)?;
        self.sign(
            &self.settings.access_secret,
            user_id,
            now,
            expires_at,
            Uuid::new_v4(),
        )
    }

    /// Verify an access token and return its user ID.
    pub fn parse_access_token(&self, token: &str) -> Result<i64, TokenError> {
        let claims = self
            .verify(&self.settings.access_secret, token)
            .ok_or(TokenError::ExpiredOrInvalid)?;
        if claims.sub.is_empty() {
            return Err(TokenError::InvalidSubject);
        }
        claims
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::InvalidSubject)
    }

    /// Sign a long-lived refresh token with a fresh random `jti`.
    pub fn generate_refresh_token(&self, user_id: i64) -> Result<IssuedRefreshToken, TokenError> {
        let jti = Uuid::new_v4();
        let issued_at = Utc::now();
        let expires_at = expiry(issued_at, self.settings.refresh_ttl)?;
        let token = self.sign(
            &self.settings.refresh_secret,
            user_id,
            issued_at,
            expires_at,
            jti,
        )?;
        Ok(IssuedRefreshToken {
            token,
            jti,
            issued_at,
            expires_at,
        })
    }

    /// Verify a refresh token and return the user ID and `jti` it carries.
    pub fn parse_refresh_token(&self, token: &str) -> Result<RefreshIdentity, TokenError> {
        let claims = self
            .verify(&self.settings.refresh_secret, token)
            .ok_or(TokenError::RefreshExpiredOrInvalid)?;
        if claims.sub.is_empty() || claims.jti.is_empty() {
            return Err(TokenError::InvalidClaims);
        }
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::InvalidClaims)?;
        let jti = Uuid::parse_str(&claims.jti).map_err(|_| TokenError::InvalidClaims)?;
        Ok(RefreshIdentity { user_id, jti })
    }

    fn sign(
        &self,
        secret: &str,
        user_id: i64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        jti: Uuid,
    ) -> Result<String, TokenError> {
        check_secret(secret)?;

        let claims = TokenClaims {
            sub: user_id.to_string(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp() - CLOCK_SKEW_SECS,
            exp: expires_at.timestamp(),
            jti: jti.to_string(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Signature, algorithm, issuer, audience, `exp` and `nbf` checks.
    /// Only HS256 is accepted, which also rules out `alg: none`.
    fn verify(&self, secret: &str, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_SECS as u64;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.settings.issuer]);
        validation.set_audience(&[&self.settings.audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);

        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| tracing::debug!(error = %e, "token rejected"))
        .ok()
        .map(|data| data.claims)
    }
}

fn check_secret(secret: &str) -> Result<(), TokenError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(TokenError::SecretTooShort);
    }
    Ok(())
}

fn check_ttl(ttl: Duration, max: Duration) -> Result<(), TokenError> {
    if ttl <= Duration::zero() || ttl > max {
        return Err(TokenError::InvalidTtl);
    }
    Ok(())
}

/// `now + ttl`, or [`TokenError::InvalidTtl`] if the lifetime is not
/// positive or the sum leaves the representable range.
fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, TokenError> {
    if ttl <= Duration::zero() {
        return Err(TokenError::InvalidTtl);
    }
    now.checked_add_signed(ttl).ok_or(TokenError::InvalidTtl)
}

/// SHA-256 of a raw token as lower-case hex, for ledger storage.
pub fn sha256_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fixed-time equality for secret-derived values. Never compare token
/// hashes with `==`.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
