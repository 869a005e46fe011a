//! `SQLite` implementation of the toggle state repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use switchyard_core::ports::ToggleStateRepository;
use switchyard_core::{RepositoryError, ServerToggleState};

use super::map_sqlx_error;

/// `SQLite` implementation of the toggle state repository.
///
/// One row per server at most; absence means "use the recommended default".
pub struct SqliteToggleStateRepository {
    pool: SqlitePool,
}

impl SqliteToggleStateRepository {
    /// Create a new `SQLite` toggle state repository.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ToggleRow {
    server_id: String,
    enabled: bool,
    updated_at: DateTime<Utc>,
}

impl From<ToggleRow> for ServerToggleState {
    fn from(row: ToggleRow) -> Self {
        Self {
            server_id: row.server_id,
            enabled: row.enabled,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ToggleStateRepository for SqliteToggleStateRepository {
    async fn get(&self, server_id: &str) -> Result<Option<ServerToggleState>, RepositoryError> {
        let row = sqlx::query_as::<_, ToggleRow>(
            "SELECT server_id, enabled, updated_at FROM server_states WHERE server_id = ?",
        )
        .bind(server_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<ServerToggleState>, RepositoryError> {
        let rows = sqlx::query_as::<_, ToggleRow>(
            "SELECT server_id, enabled, updated_at FROM server_states ORDER BY server_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert(
        &self,
        server_id: &str,
        enabled: bool,
    ) -> Result<ServerToggleState, RepositoryError> {
        let row = sqlx::query_as::<_, ToggleRow>(
            r"
            INSERT INTO server_states (server_id, enabled, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (server_id) DO UPDATE SET
                enabled = excluded.enabled,
                updated_at = excluded.updated_at
            RETURNING server_id, enabled, updated_at
            ",
        )
        .bind(server_id)
        .bind(enabled)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete(&self, server_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM server_states WHERE server_id = ?")
            .bind(server_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
