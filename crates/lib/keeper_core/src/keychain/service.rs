//! Seal-and-store and load-and-open flows for keychain entries.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::KeychainError;
use super::repository::KeychainRepository;
use crate::crypto::Envelope;
use crate::models::keychain::{KeyRecord, KeySummary, KeyType, SecretPayload};
use crate::validation;

/// Validates, encrypts and persists secrets; decrypts them on the way out.
#[derive(Clone)]
pub struct KeychainService {
    repo: Arc<dyn KeychainRepository>,
    envelope: Arc<Envelope>,
}

impl KeychainService {
    pub fn new(repo: Arc<dyn KeychainRepository>, envelope: Arc<Envelope>) -> Self {
        Self { repo, envelope }
    }

    /// Store a new secret and return its UUID. Nothing is written unless
    /// both the title and the payload validate.
    pub async fn add_key(
        &self,
        user_id: i64,
        title: &str,
        payload: &SecretPayload,
    ) -> Result<Uuid, KeychainError> {
        validation::validate_title(title)?;
        payload.validate()?;

        let plaintext = payload.encode()?;
        let sealed = self.envelope.encrypt(&plaintext)?;
        let key_type = payload.key_type();

        let key_uuid = self
            .repo
            .add_key(user_id, key_type, title, &sealed.ciphertext, &sealed.nonce)
            .await?;
        info!(user_id, %key_uuid, %key_type, "key added");
        Ok(key_uuid)
    }

    /// Load and decrypt one of the user's secrets.
    pub async fn get_key(
        &self,
        user_id: i64,
        key_uuid: Uuid,
    ) -> Result<(KeyRecord, SecretPayload), KeychainError> {
        let record = self
            .repo
            .get_user_key(user_id, key_uuid)
            .await?
            .ok_or(KeychainError::NotFound)?;

        let plaintext = self.envelope.decrypt(&record.nonce, &record.ciphertext)?;
        let payload = SecretPayload::decode(record.key_type, &plaintext)?;
        debug!(user_id, %key_uuid, "key opened");
        Ok((record, payload))
    }

    pub async fn get_keys(
        &self,
        user_id: i64,
        key_type: Option<KeyType>,
    ) -> Result<Vec<KeySummary>, KeychainError> {
        self.repo.get_user_keys(user_id, key_type).await
    }

    pub async fn delete_key(&self, user_id: i64, key_uuid: Uuid) -> Result<(), KeychainError> {
        self.repo.delete_key(user_id, key_uuid).await?;
        info!(user_id, %key_uuid, "key deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoError;
    use crate::memory::MemoryKeychainRepository;
    use crate::models::keychain::{CardData, CredentialData, FileData, TextData};
    use crate::validation::ValidationError;

    const KEY: &[u8; 32] = b"keeper-test-key-keeper-test-key!";

    fn service() -> (KeychainService, Arc<MemoryKeychainRepository>) {
        let repo = Arc::new(MemoryKeychainRepository::new());
        let envelope = Arc::new(Envelope::new(KEY).unwrap());
        (KeychainService::new(repo.clone(), envelope), repo)
    }

    fn credential() -> SecretPayload {
        SecretPayload::Credential(CredentialData {
            login: "alice@example.com".into(),
            password: "hunter2".into(),
            site: "example.com".into(),
            note: String::new(),
        })
    }

    fn text(body: &str) -> SecretPayload {
        SecretPayload::Text(TextData {
            text: body.into(),
            note: String::new(),
        })
    }

    #[tokio::test]
    async fn add_get_delete_lifecycle() {
        let (svc, _) = service();
        let payload = credential();

        let id = svc.add_key(1, "Mail", &payload).await.unwrap();
        let (record, opened) = svc.get_key(1, id).await.unwrap();
        assert_eq!(record.title, "Mail");
        assert_eq!(record.key_type, KeyType::Credential);
        assert_eq!(opened, payload);

        svc.delete_key(1, id).await.unwrap();
        assert!(matches!(
            svc.get_key(1, id).await,
            Err(KeychainError::NotFound)
        ));
        assert!(matches!(
            svc.delete_key(1, id).await,
            Err(KeychainError::NotFound)
        ));
        assert!(svc.get_keys(1, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stored_bytes_are_sealed() {
        let (svc, repo) = service();
        let id = svc.add_key(1, "Note", &text("launch codes")).await.unwrap();
        let record = repo.get_user_key(1, id).await.unwrap().unwrap();

        assert_eq!(record.nonce.len(), crate::crypto::NONCE_SIZE);
        let haystack = String::from_utf8_lossy(&record.ciphertext);
        assert!(!haystack.contains("launch codes"));
    }

    #[tokio::test]
    async fn other_users_cannot_see_or_delete() {
        let (svc, _) = service();
        let id = svc.add_key(1, "Mail", &credential()).await.unwrap();

        assert!(matches!(
            svc.get_key(2, id).await,
            Err(KeychainError::NotFound)
        ));
        assert!(matches!(
            svc.delete_key(2, id).await,
            Err(KeychainError::NotFound)
        ));
        assert!(svc.get_keys(2, None).await.unwrap().is_empty());
        assert!(svc.get_key(1, id).await.is_ok());
    }

    #[tokio::test]
    async fn listing_filters_by_type_newest_first() {
        let (svc, _) = service();
        let first = svc.add_key(1, "one", &text("a")).await.unwrap();
        svc.add_key(1, "mail", &credential()).await.unwrap();
        let third = svc.add_key(1, "three", &text("c")).await.unwrap();

        let all = svc.get_keys(1, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let texts = svc.get_keys(1, Some(KeyType::Text)).await.unwrap();
        let ids: Vec<_> = texts.iter().map(|k| k.key_uuid).collect();
        assert_eq!(ids, vec![third, first]);
        assert!(
            svc.get_keys(1, Some(KeyType::File))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn invalid_input_is_not_stored() {
        let (svc, repo) = service();

        let err = svc.add_key(1, "   ", &credential()).await.unwrap_err();
        assert!(matches!(
            err,
            KeychainError::Validation(ValidationError::TitleEmpty)
        ));

        let bad_card = SecretPayload::Card(CardData {
            number: "1234567890".into(),
            exp_date: "12/30".into(),
            cvv: "123".into(),
            holder: String::new(),
            bank: String::new(),
            note: String::new(),
        });
        let err = svc.add_key(1, "Card", &bad_card).await.unwrap_err();
        assert!(matches!(
            err,
            KeychainError::Validation(ValidationError::InvalidCardNumber)
        ));

        let err = svc.add_key(1, "Empty", &text("  ")).await.unwrap_err();
        assert!(matches!(
            err,
            KeychainError::Validation(ValidationError::EmptyText)
        ));

        assert_eq!(repo.stored_len(), 0);
    }

    #[tokio::test]
    async fn card_and_file_round_trip() {
        let (svc, _) = service();
        let card = SecretPayload::Card(CardData {
            number: "4716 5327 5523 7178".into(),
            exp_date: "12/30".into(),
            cvv: "123".into(),
            holder: "Alice".into(),
            bank: "Bank".into(),
            note: String::new(),
        });
        let file = SecretPayload::File(FileData {
            file: vec![0, 159, 146, 150, 255],
            note: "binary".into(),
        });

        for (title, payload) in [("My Card", card), ("blob.bin", file)] {
            let id = svc.add_key(7, title, &payload).await.unwrap();
            let (record, opened) = svc.get_key(7, id).await.unwrap();
            assert_eq!(record.key_type, payload.key_type());
            assert_eq!(opened, payload);
        }
    }

    #[tokio::test]
    async fn wrong_key_cannot_open() {
        let repo = Arc::new(MemoryKeychainRepository::new());
        let writer = KeychainService::new(repo.clone(), Arc::new(Envelope::new(KEY).unwrap()));
        let reader = KeychainService::new(
            repo,
            Arc::new(Envelope::new(&[7u8; 32]).unwrap()),
        );

        let id = writer.add_key(1, "Mail", &credential()).await.unwrap();
        assert!(matches!(
            reader.get_key(1, id).await,
            Err(KeychainError::Crypto(CryptoError::AuthenticationFailed))
        ));
    }
}
