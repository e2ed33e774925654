//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::with_deadline;
use crate::AppState;
use crate::error::AppResult;
use crate::models::{LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest, TokenResponse};

/// `POST /api/auth/register`: create an account and open a session.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let session = with_deadline(state.auth.register(&body.login, &body.password)).await?;
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            id: session.user_id,
        }),
    ))
}

/// `POST /api/auth/login`: authenticate with login + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let session = with_deadline(state.auth.login(&body.login, &body.password)).await?;
    Ok(Json(TokenResponse {
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        id: session.user_id,
    }))
}

/// `POST /api/auth/refresh`: exchange a refresh token for a new pair. The
/// presented token is spent.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let pair = with_deadline(state.auth.refresh(&body.refresh_token)).await?;
    Ok(Json(RefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}
