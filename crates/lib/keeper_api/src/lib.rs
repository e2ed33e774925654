//! # keeper_api
//!
//! HTTP API library for Keeper.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::http::header::CACHE_CONTROL;
use axum::routing::{get, post};
use keeper_core::auth::jwt::{JwtManager, TokenError};
use keeper_core::auth::password::{BcryptHasher, PasswordHasher};
use keeper_core::auth::queries::{PgTokenRepository, PgUserRepository};
use keeper_core::auth::repository::{TokenRepository, UserRepository};
use keeper_core::auth::service::AuthService;
use keeper_core::crypto::{CryptoError, Envelope};
use keeper_core::keychain::queries::PgKeychainRepository;
use keeper_core::keychain::repository::KeychainRepository;
use keeper_core::keychain::service::KeychainService;
use sqlx::PgPool;
use thiserror::Error;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, keychain};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    pub auth: Arc<AuthService>,
    pub keychain: Arc<KeychainService>,
}

/// Configuration that cannot produce a working server.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("JWT configuration: {0}")]
    Jwt(#[from] TokenError),

    #[error("crypt key: {0}")]
    Crypt(#[from] CryptoError),
}

/// Storage backends behind the services.
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub keychain: Arc<dyn KeychainRepository>,
}

impl Repositories {
    /// Postgres repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            tokens: Arc::new(PgTokenRepository::new(pool.clone())),
            keychain: Arc::new(PgKeychainRepository::new(pool)),
        }
    }
}

impl AppState {
    /// Wire services over `repos`. Fails if either JWT secret is too short,
    /// a token lifetime is out of range, or the crypt key is not 32 bytes.
    pub fn new(
        config: ApiConfig,
        repos: Repositories,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, StateError> {
        let jwt = JwtManager::new(config.jwt.clone());
        jwt.validate_secrets()?;
        jwt.validate_ttls()?;
        let envelope = Envelope::new(config.crypt_key.as_bytes())?;

        let auth = AuthService::new(repos.users, repos.tokens, hasher, Arc::new(jwt));
        let keychain = KeychainService::new(repos.keychain, Arc::new(envelope));

        Ok(Self {
            config,
            auth: Arc::new(auth),
            keychain: Arc::new(keychain),
        })
    }

    /// Production wiring: Postgres repositories and bcrypt.
    pub fn with_pool(pool: PgPool, config: ApiConfig) -> Result<Self, StateError> {
        Self::new(
            config,
            Repositories::postgres(pool),
            Arc::new(BcryptHasher::new()),
        )
    }
}

/// Run embedded database migrations.
///
/// Delegates to `keeper_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    keeper_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes. Token responses must never be cached.
    let public = Router::new()
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/api/keychain", get(keychain::list_keys_handler))
        .route(
            "/api/keychain/{uuid}",
            get(keychain::get_key_handler).delete(keychain::delete_key_handler),
        )
        .route(
            "/api/keychain/credential",
            post(keychain::add_credential_handler),
        )
        .route("/api/keychain/card", post(keychain::add_card_handler))
        .route("/api/keychain/text", post(keychain::add_text_handler))
        .route(
            "/api/keychain/file",
            post(keychain::add_file_handler)
                .layer(DefaultBodyLimit::max(keychain::MAX_UPLOAD_BYTES)),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
