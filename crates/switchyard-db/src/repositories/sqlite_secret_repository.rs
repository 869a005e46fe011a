//! `SQLite` implementation of the secret repository.
//!
//! Values arrive already encrypted and are stored as BLOBs. This module
//! never sees plaintext.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use switchyard_core::ports::SecretRepository;
use switchyard_core::{RepositoryError, SecretMetadata};
use switchyard_core::domain::SecretRecord;

use super::map_sqlx_error;

/// `SQLite` implementation of the secret repository.
pub struct SqliteSecretRepository {
    pool: SqlitePool,
}

impl SqliteSecretRepository {
    /// Create a new `SQLite` secret repository.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SecretRow {
    server_id: String,
    key: String,
    encrypted_value: Vec<u8>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SecretRow> for SecretRecord {
    fn from(row: SecretRow) -> Self {
        Self {
            server_id: row.server_id,
            key: row.key,
            encrypted_value: row.encrypted_value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MetadataRow {
    server_id: String,
    key: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl SecretRepository for SqliteSecretRepository {
    async fn upsert(
        &self,
        server_id: &str,
        key: &str,
        encrypted_value: Vec<u8>,
    ) -> Result<SecretRecord, RepositoryError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, SecretRow>(
            r"
            INSERT INTO secrets (server_id, key, encrypted_value, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (server_id, key) DO UPDATE SET
                encrypted_value = excluded.encrypted_value,
                updated_at = excluded.updated_at
            RETURNING server_id, key, encrypted_value, created_at, updated_at
            ",
        )
        .bind(server_id)
        .bind(key)
        .bind(encrypted_value)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn get(
        &self,
        server_id: &str,
        key: &str,
    ) -> Result<Option<SecretRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, SecretRow>(
            r"
            SELECT server_id, key, encrypted_value, created_at, updated_at
            FROM secrets WHERE server_id = ? AND key = ?
            ",
        )
        .bind(server_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_for_server(
        &self,
        server_id: &str,
    ) -> Result<Vec<SecretMetadata>, RepositoryError> {
        let rows = sqlx::query_as::<_, MetadataRow>(
            r"
            SELECT server_id, key, created_at, updated_at
            FROM secrets WHERE server_id = ? ORDER BY key
            ",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|r| SecretMetadata::new(r.server_id, r.key, r.created_at, r.updated_at))
            .collect())
    }

    async fn delete(&self, server_id: &str, key: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM secrets WHERE server_id = ? AND key = ?")
            .bind(server_id)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_server(&self, server_id: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM secrets WHERE server_id = ?")
            .bind(server_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn server_ids(&self) -> Result<Vec<String>, RepositoryError> {
        sqlx::query_scalar("SELECT DISTINCT server_id FROM secrets ORDER BY server_id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}
