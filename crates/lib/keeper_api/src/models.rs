//! Request and response bodies.

use chrono::{DateTime, Utc};
use keeper_core::models::keychain::{
    CardData, CredentialData, KeyRecord, KeySummary, KeyType, SecretPayload, TextData,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Returned by register and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ListKeysQuery {
    #[serde(rename = "type")]
    pub key_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct KeyInfo {
    #[serde(rename = "uuid")]
    pub key_uuid: Uuid,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<KeySummary> for KeyInfo {
    fn from(k: KeySummary) -> Self {
        Self {
            key_uuid: k.key_uuid,
            key_type: k.key_type,
            title: k.title,
            created_at: k.created_at,
            updated_at: k.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KeyListResponse {
    pub keys: Vec<KeyInfo>,
}

/// A decrypted entry. `data` has the shape of the entry's type.
#[derive(Debug, Serialize)]
pub struct KeyResponse {
    #[serde(rename = "uuid")]
    pub key_uuid: Uuid,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub title: String,
    pub data: SecretPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KeyResponse {
    pub fn new(record: KeyRecord, data: SecretPayload) -> Self {
        Self {
            key_uuid: record.key_uuid,
            key_type: record.key_type,
            title: record.title,
            data,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddKeyResponse {
    pub key_uuid: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AddCredentialRequest {
    pub title: String,
    #[serde(flatten)]
    pub data: CredentialData,
}

#[derive(Debug, Deserialize)]
pub struct AddCardRequest {
    pub title: String,
    #[serde(flatten)]
    pub data: CardData,
}

#[derive(Debug, Deserialize)]
pub struct AddTextRequest {
    pub title: String,
    #[serde(flatten)]
    pub data: TextData,
}
