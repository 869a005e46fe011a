//! Encrypted credential storage.
//!
//! [`SecretStore`] is the trusted face: it can decrypt. [`SecretInspector`]
//! is the untrusted face handed to the reconciler and to external callers:
//! it only answers whether keys exist and never touches the cipher.
//!
//! Plaintext exists outside transient memory at exactly two points:
//! `put` encrypts before the row is written, `get` decrypts after it is read.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use thiserror::Error;

use super::keyed_locks::KeyedLocks;
use crate::domain::{SecretMetadata, SecretValue};
use crate::ports::{CipherError, RepositoryError, SecretCipher, SecretRepository};

#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("No secret '{key}' stored for server '{server_id}'")]
    NotFound { server_id: String, key: String },

    /// Transient; retrying may succeed.
    #[error("Secret storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for SecretStoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Storage(msg) => Self::StorageUnavailable(msg),
            other => Self::Repository(other),
        }
    }
}

impl SecretStoreError {
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

/// Trusted secret store with encrypt-on-write and decrypt-on-read.
#[derive(Clone)]
pub struct SecretStore {
    repo: Arc<dyn SecretRepository>,
    cipher: Arc<dyn SecretCipher>,
    locks: KeyedLocks,
}

impl SecretStore {
    pub fn new(repo: Arc<dyn SecretRepository>, cipher: Arc<dyn SecretCipher>) -> Self {
        Self {
            repo,
            cipher,
            locks: KeyedLocks::new(),
        }
    }

    /// Share the per-server lock table used by the reconciler.
    ///
    /// Deletes take the server's guard so they cannot interleave with a
    /// gating check. `put` does not: its caller already holds the guard.
    #[must_use]
    pub fn with_locks(mut self, locks: KeyedLocks) -> Self {
        self.locks = locks;
        self
    }

    /// The read-only, plaintext-free handle.
    pub fn inspector(&self) -> SecretInspector {
        SecretInspector {
            repo: Arc::clone(&self.repo),
        }
    }

    /// Encrypt and store a value, overwriting any previous one.
    ///
    /// If encryption fails nothing is written.
    pub async fn put(
        &self,
        server_id: &str,
        key: &str,
        plaintext: &str,
    ) -> Result<SecretMetadata, SecretStoreError> {
        let encrypted = self.cipher.encrypt(plaintext)?;
        let record = self.repo.upsert(server_id, key, encrypted).await?;
        tracing::info!(server_id = %server_id, key = %key, "Stored secret");
        Ok(SecretMetadata::from(&record))
    }

    /// Decrypt a stored value. Trusted callers only.
    pub async fn get(&self, server_id: &str, key: &str) -> Result<SecretValue, SecretStoreError> {
        let record =
            self.repo
                .get(server_id, key)
                .await?
                .ok_or_else(|| SecretStoreError::NotFound {
                    server_id: server_id.to_string(),
                    key: key.to_string(),
                })?;
        Ok(self.cipher.decrypt(&record.encrypted_value)?)
    }

    /// Decrypt every listed key that is stored, skipping absent ones.
    pub async fn get_many<'a, I>(
        &self,
        server_id: &str,
        keys: I,
    ) -> Result<BTreeMap<String, SecretValue>, SecretStoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values = BTreeMap::new();
        for key in keys {
            match self.get(server_id, key).await {
                Ok(value) => {
                    values.insert(key.to_string(), value);
                }
                Err(SecretStoreError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(values)
    }

    pub async fn exists(&self, server_id: &str, key: &str) -> Result<bool, SecretStoreError> {
        self.inspector().exists(server_id, key).await
    }

    pub async fn list_keys(&self, server_id: &str) -> Result<BTreeSet<String>, SecretStoreError> {
        self.inspector().list_keys(server_id).await
    }

    pub async fn metadata(&self, server_id: &str) -> Result<Vec<SecretMetadata>, SecretStoreError> {
        self.inspector().metadata(server_id).await
    }

    pub async fn delete(&self, server_id: &str, key: &str) -> Result<bool, SecretStoreError> {
        let _guard = self.locks.lock(server_id).await;
        let deleted = self.repo.delete(server_id, key).await?;
        if deleted {
            tracing::info!(server_id = %server_id, key = %key, "Deleted secret");
        }
        Ok(deleted)
    }

    /// Delete every secret of a server, returning how many were removed.
    pub async fn delete_server(&self, server_id: &str) -> Result<u64, SecretStoreError> {
        let _guard = self.locks.lock(server_id).await;
        let count = self.repo.delete_for_server(server_id).await?;
        tracing::info!(server_id = %server_id, count, "Deleted server secrets");
        Ok(count)
    }
}

/// Plaintext-free view of the secret store.
#[derive(Clone)]
pub struct SecretInspector {
    repo: Arc<dyn SecretRepository>,
}

impl SecretInspector {
    pub async fn exists(&self, server_id: &str, key: &str) -> Result<bool, SecretStoreError> {
        Ok(self.repo.get(server_id, key).await?.is_some())
    }

    pub async fn list_keys(&self, server_id: &str) -> Result<BTreeSet<String>, SecretStoreError> {
        let rows = self.repo.list_for_server(server_id).await?;
        Ok(rows.into_iter().map(|m| m.key).collect())
    }

    /// Masked metadata, ordered by key.
    pub async fn metadata(&self, server_id: &str) -> Result<Vec<SecretMetadata>, SecretStoreError> {
        Ok(self.repo.list_for_server(server_id).await?)
    }

    /// Server ids that have at least one stored secret.
    pub async fn server_ids(&self) -> Result<Vec<String>, SecretStoreError> {
        Ok(self.repo.server_ids().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SECRET_MASK;
    use crate::ports::LockedCipher;
    use crate::testing::{InMemoryStore, PlaintextCipher};

    fn store() -> (SecretStore, Arc<InMemoryStore>) {
        let mem = Arc::new(InMemoryStore::new());
        let store = SecretStore::new(mem.clone(), Arc::new(PlaintextCipher));
        (store, mem)
    }

    #[tokio::test]
    async fn put_then_get_round_trips_through_cipher() {
        let (store, mem) = store();
        store.put("github", "TOKEN", "ghp_abc").await.unwrap();

        assert_ne!(mem.raw_secret("github", "TOKEN").unwrap(), b"ghp_abc".to_vec());
        assert_eq!(store.get("github", "TOKEN").await.unwrap().expose(), "ghp_abc");
    }

    #[tokio::test]
    async fn put_overwrites_existing_value() {
        let (store, _) = store();
        store.put("github", "TOKEN", "old").await.unwrap();
        store.put("github", "TOKEN", "new").await.unwrap();
        assert_eq!(store.get("github", "TOKEN").await.unwrap().expose(), "new");
        assert_eq!(store.list_keys("github").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (store, _) = store();
        let err = store.get("github", "TOKEN").await.unwrap_err();
        assert!(matches!(err, SecretStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn locked_cipher_writes_nothing() {
        let mem = Arc::new(InMemoryStore::new());
        let store = SecretStore::new(mem.clone(), Arc::new(LockedCipher));

        let err = store.put("github", "TOKEN", "ghp_abc").await.unwrap_err();
        assert!(matches!(err, SecretStoreError::Cipher(CipherError::Locked)));
        assert!(mem.raw_secret("github", "TOKEN").is_none());
    }

    #[tokio::test]
    async fn inspector_reports_masked_metadata() {
        let (store, _) = store();
        store.put("slack", "SLACK_TEAM_ID", "T12345678").await.unwrap();
        store.put("slack", "SLACK_BOT_TOKEN", "xoxb-1-2-abc").await.unwrap();

        let inspector = store.inspector();
        assert!(inspector.exists("slack", "SLACK_TEAM_ID").await.unwrap());
        let metadata = inspector.metadata("slack").await.unwrap();
        let keys: Vec<_> = metadata.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["SLACK_BOT_TOKEN", "SLACK_TEAM_ID"]);
        assert!(metadata.iter().all(|m| m.masked_value == SECRET_MASK));
    }

    #[tokio::test]
    async fn delete_server_removes_only_that_server() {
        let (store, _) = store();
        store.put("a", "K1", "1").await.unwrap();
        store.put("a", "K2", "2").await.unwrap();
        store.put("b", "K1", "3").await.unwrap();

        assert_eq!(store.delete_server("a").await.unwrap(), 2);
        assert!(store.list_keys("a").await.unwrap().is_empty());
        assert!(store.exists("b", "K1").await.unwrap());
    }

    #[tokio::test]
    async fn storage_failure_is_retryable() {
        let (store, mem) = store();
        mem.fail_secret_writes_after(0);
        let err = store.put("a", "K", "v").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
