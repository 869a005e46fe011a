//! Encrypted secret repository trait.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{SecretMetadata, SecretRecord};

/// Repository for encrypted credential rows, unique per `(server_id, key)`.
#[async_trait]
pub trait SecretRepository: Send + Sync {
    /// Insert or overwrite a row, returning the stored record.
    async fn upsert(
        &self,
        server_id: &str,
        key: &str,
        encrypted_value: Vec<u8>,
    ) -> Result<SecretRecord, RepositoryError>;

    async fn get(&self, server_id: &str, key: &str)
    -> Result<Option<SecretRecord>, RepositoryError>;

    /// Metadata for every row of one server, ordered by key.
    async fn list_for_server(&self, server_id: &str)
    -> Result<Vec<SecretMetadata>, RepositoryError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, server_id: &str, key: &str) -> Result<bool, RepositoryError>;

    /// Returns the number of rows deleted.
    async fn delete_for_server(&self, server_id: &str) -> Result<u64, RepositoryError>;

    /// Distinct server ids that have at least one row, sorted.
    async fn server_ids(&self) -> Result<Vec<String>, RepositoryError>;
}
