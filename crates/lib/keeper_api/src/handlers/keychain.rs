//! Keychain request handlers. All routes require authentication.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use keeper_core::models::keychain::{FileData, KeyType, SecretPayload};
use uuid::Uuid;

use super::with_deadline;
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AddCardRequest, AddCredentialRequest, AddKeyResponse, AddTextRequest, KeyInfo,
    KeyListResponse, KeyResponse, ListKeysQuery,
};

/// Request body cap for file uploads.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn parse_key_uuid(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("invalid key uuid".into()))
}

/// `GET /api/keychain?type=`: list the caller's keys, newest first.
pub async fn list_keys_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Query(query): Query<ListKeysQuery>,
) -> AppResult<Json<KeyListResponse>> {
    let key_type = query
        .key_type
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<KeyType>())
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let keys = with_deadline(state.keychain.get_keys(user.0, key_type)).await?;
    Ok(Json(KeyListResponse {
        keys: keys.into_iter().map(KeyInfo::from).collect(),
    }))
}

/// `GET /api/keychain/{uuid}`: fetch and decrypt one key.
pub async fn get_key_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(key_uuid): Path<String>,
) -> AppResult<Json<KeyResponse>> {
    let key_uuid = parse_key_uuid(&key_uuid)?;
    let (record, payload) = with_deadline(state.keychain.get_key(user.0, key_uuid)).await?;
    Ok(Json(KeyResponse::new(record, payload)))
}

/// `DELETE /api/keychain/{uuid}`.
pub async fn delete_key_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(key_uuid): Path<String>,
) -> AppResult<StatusCode> {
    let key_uuid = parse_key_uuid(&key_uuid)?;
    with_deadline(state.keychain.delete_key(user.0, key_uuid)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_key(
    state: &AppState,
    user: AuthenticatedUser,
    title: &str,
    payload: SecretPayload,
) -> AppResult<(StatusCode, Json<AddKeyResponse>)> {
    let key_uuid = with_deadline(state.keychain.add_key(user.0, title, &payload)).await?;
    Ok((StatusCode::CREATED, Json(AddKeyResponse { key_uuid })))
}

/// `POST /api/keychain/credential`.
pub async fn add_credential_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(body): Json<AddCredentialRequest>,
) -> AppResult<(StatusCode, Json<AddKeyResponse>)> {
    add_key(&state, user, &body.title, SecretPayload::Credential(body.data)).await
}

/// `POST /api/keychain/card`.
pub async fn add_card_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(body): Json<AddCardRequest>,
) -> AppResult<(StatusCode, Json<AddKeyResponse>)> {
    add_key(&state, user, &body.title, SecretPayload::Card(body.data)).await
}

/// `POST /api/keychain/text`.
pub async fn add_text_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(body): Json<AddTextRequest>,
) -> AppResult<(StatusCode, Json<AddKeyResponse>)> {
    add_key(&state, user, &body.title, SecretPayload::Text(body.data)).await
}

/// `POST /api/keychain/file`: multipart form with `file`, `title` and an
/// optional `note`.
pub async fn add_file_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<AddKeyResponse>)> {
    let mut file = None;
    let mut title = String::new();
    let mut note = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => file = Some(field.bytes().await?.to_vec()),
            Some("title") => title = field.text().await?,
            Some("note") => note = field.text().await?,
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("missing file field".into()))?;
    add_key(
        &state,
        user,
        &title,
        SecretPayload::File(FileData { file, note }),
    )
    .await
}
