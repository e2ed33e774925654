//! Keychain domain models.
//!
//! [`KeyType`] is the closed set of secret kinds and [`SecretPayload`] is
//! the matching set of plaintext shapes. [`SecretPayload::encode`] and
//! [`SecretPayload::decode`] are the only place the two are tied together;
//! adding a kind means adding a variant to both enums and one arm to each
//! match below (plus the `keychain.type` check constraint in the migrations).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::validation::{self, ValidationError};

/// Kind of secret stored in a keychain entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Credential,
    Text,
    File,
    Card,
}

impl KeyType {
    pub const ALL: [KeyType; 4] = [
        KeyType::Credential,
        KeyType::Text,
        KeyType::File,
        KeyType::Card,
    ];

    /// Storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyType::Credential => "credential",
            KeyType::Text => "text",
            KeyType::File => "file",
            KeyType::Card => "card",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string that does not name a [`KeyType`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key type: {0}")]
pub struct UnknownKeyType(pub String);

impl FromStr for KeyType {
    type Err = UnknownKeyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownKeyType(s.to_string()))
    }
}

/// Login/password pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialData {
    pub login: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub site: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

/// Bank card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
    pub number: String,
    pub exp_date: String,
    pub cvv: String,
    pub holder: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bank: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

/// Free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

/// Arbitrary file contents, base64 in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    #[serde(with = "base64_bytes")]
    pub file: Vec<u8>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

/// Decrypted contents of a keychain entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SecretPayload {
    Credential(CredentialData),
    Card(CardData),
    Text(TextData),
    File(FileData),
}

impl SecretPayload {
    /// Type tag stored alongside the ciphertext.
    pub fn key_type(&self) -> KeyType {
        match self {
            SecretPayload::Credential(_) => KeyType::Credential,
            SecretPayload::Card(_) => KeyType::Card,
            SecretPayload::Text(_) => KeyType::Text,
            SecretPayload::File(_) => KeyType::File,
        }
    }

    /// Run the validator matching this payload's kind.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            SecretPayload::Credential(d) => validation::validate_credential(&d.login),
            SecretPayload::Card(d) => validation::validate_card(&d.number, &d.cvv),
            SecretPayload::Text(d) => validation::validate_text(&d.text),
            SecretPayload::File(_) => Ok(()),
        }
    }

    /// Serialize to the plaintext bytes that get encrypted.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            SecretPayload::Credential(d) => serde_json::to_vec(d),
            SecretPayload::Card(d) => serde_json::to_vec(d),
            SecretPayload::Text(d) => serde_json::to_vec(d),
            SecretPayload::File(d) => serde_json::to_vec(d),
        }
    }

    /// Parse decrypted bytes according to the record's type tag.
    pub fn decode(key_type: KeyType, plaintext: &[u8]) -> serde_json::Result<Self> {
        Ok(match key_type {
            KeyType::Credential => SecretPayload::Credential(serde_json::from_slice(plaintext)?),
            KeyType::Card => SecretPayload::Card(serde_json::from_slice(plaintext)?),
            KeyType::Text => SecretPayload::Text(serde_json::from_slice(plaintext)?),
            KeyType::File => SecretPayload::File(serde_json::from_slice(plaintext)?),
        })
    }
}

/// Full keychain row, including the sealed payload.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub id: i64,
    pub key_uuid: Uuid,
    pub user_id: i64,
    pub key_type: KeyType,
    pub title: String,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Keychain listing entry (no payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySummary {
    pub key_uuid: Uuid,
    pub key_type: KeyType,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&KeyRecord> for KeySummary {
    fn from(r: &KeyRecord) -> Self {
        Self {
            key_uuid: r.key_uuid,
            key_type: r.key_type,
            title: r.title.clone(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
