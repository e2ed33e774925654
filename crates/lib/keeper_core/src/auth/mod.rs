//! Authentication and session management.
//!
//! Provides password hashing, JWT management, the refresh-token ledger and
//! the register/login/refresh orchestration built on top of them.

pub mod jwt;
pub mod password;
pub mod queries;
pub mod repository;
pub mod service;

use thiserror::Error;

use self::jwt::TokenError;
use crate::validation::ValidationError;

/// Authentication errors.
///
/// Credential and refresh failures are deliberately coarse: callers cannot
/// tell an unknown login from a wrong password, or a replayed refresh token
/// from a forged one.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("wrong login or password")]
    InvalidCredentials,

    #[error("invalid refresh token")]
    InvalidRefreshCredentials,

    #[error("refresh token already rotated or expired")]
    AlreadyRotatedOrExpired,

    #[error("provided login already exists")]
    DuplicateLogin,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
