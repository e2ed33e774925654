//! API server configuration.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Duration;
use keeper_core::auth::jwt::{JwtSettings, MAX_ACCESS_TTL_MINUTES, MAX_REFRESH_TTL_DAYS};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

/// Length of generated HMAC secrets.
const GENERATED_JWT_SECRET_LEN: usize = 64;
/// Length of a generated crypt key; AES-256 takes the raw 32 bytes.
const GENERATED_CRYPT_KEY_LEN: usize = 32;

const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
const DEFAULT_REFRESH_TTL_DAYS: i64 = 30;

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Access/refresh token signing settings.
    pub jwt: JwtSettings,
    /// Keychain encryption key. Used as raw bytes and must be exactly 32.
    pub crypt_key: String,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("pg_connection_url", &self.pg_connection_url)
            .field("jwt", &self.jwt)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                 | Default                               |
    /// |--------------------------|---------------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:8080`                      |
    /// | `DATABASE_URL`           | `postgres://localhost:5432/keeper`    |
    /// | `JWT_ISSUER`             | `keeper`                              |
    /// | `JWT_AUDIENCE`           | `keeper-server`                       |
    /// | `JWT_ACCESS_SECRET`      | generated & persisted to file         |
    /// | `JWT_REFRESH_SECRET`     | generated & persisted to file         |
    /// | `JWT_ACCESS_TTL_MINUTES` | `15` (at most 1440)                   |
    /// | `JWT_REFRESH_TTL_DAYS`   | `30` (at most 365)                    |
    /// | `CRYPT_SECRET`           | generated & persisted to file         |
    ///
    /// Unparsable or out-of-range lifetimes are logged and replaced by their
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:8080"),
            pg_connection_url: env_or("DATABASE_URL", "postgres://localhost:5432/keeper"),
            jwt: JwtSettings {
                issuer: env_or("JWT_ISSUER", "keeper"),
                audience: env_or("JWT_AUDIENCE", "keeper-server"),
                access_secret: resolve_secret(
                    "JWT_ACCESS_SECRET",
                    "jwt-access-secret",
                    GENERATED_JWT_SECRET_LEN,
                ),
                access_ttl: env_ttl(
                    "JWT_ACCESS_TTL_MINUTES",
                    Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
                    MAX_ACCESS_TTL_MINUTES,
                    Duration::try_minutes,
                ),
                refresh_secret: resolve_secret(
                    "JWT_REFRESH_SECRET",
                    "jwt-refresh-secret",
                    GENERATED_JWT_SECRET_LEN,
                ),
                refresh_ttl: env_ttl(
                    "JWT_REFRESH_TTL_DAYS",
                    Duration::days(DEFAULT_REFRESH_TTL_DAYS),
                    MAX_REFRESH_TTL_DAYS,
                    Duration::try_days,
                ),
            },
            crypt_key: resolve_secret("CRYPT_SECRET", "crypt-secret", GENERATED_CRYPT_KEY_LEN),
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_ttl(
    var: &str,
    default: Duration,
    max: i64,
    unit: fn(i64) -> Option<Duration>,
) -> Duration {
    match std::env::var(var) {
        Ok(raw) => parse_ttl(&raw, max, unit).unwrap_or_else(|| {
            warn!(var, value = %raw, max, "ignoring invalid lifetime");
            default
        }),
        Err(_) => default,
    }
}

/// A whole number of `unit`s in `1..=max`.
fn parse_ttl(raw: &str, max: i64, unit: fn(i64) -> Option<Duration>) -> Option<Duration> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|v| (1..=max).contains(v))
        .and_then(unit)
}

/// Resolve a secret: env var `var` → persisted file → generate and persist.
pub fn resolve_secret(var: &str, file_name: &str, len: usize) -> String {
    let from_env = std::env::var(var).ok();
    resolve_secret_at(from_env, &secret_path(file_name), len)
}

fn resolve_secret_at(from_env: Option<String>, path: &Path, len: usize) -> String {
    if let Some(secret) = from_env
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = std::fs::write(path, &secret) {
        warn!(path = %path.display(), error = %e, "could not persist generated secret");
    } else {
        info!(path = %path.display(), "generated new secret");
    }
    secret
}

/// Path to a persisted secret file.
fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keeper")
        .join(file_name)
}
