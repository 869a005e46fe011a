//! `SQLite` implementation of the server catalog repository.
//!
//! Launch arguments are stored as a JSON array. Listing follows insertion
//! order through the `position` column.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use switchyard_core::ports::{RemovalSummary, ServerRepository};
use switchyard_core::{LaunchSpec, RepositoryError, ServerCategory, ServerDescriptor};

use super::map_sqlx_error;

/// `SQLite` implementation of the server catalog repository.
pub struct SqliteServerRepository {
    pool: SqlitePool,
}

impl SqliteServerRepository {
    /// Create a new `SQLite` server repository.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal row types for database queries
// ─────────────────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ServerRow {
    id: String,
    name: String,
    description: String,
    category: String,
    builtin: bool,
    recommended: bool,
    requires_credentials: bool,
    command: String,
    args: String,
}

const SELECT_COLUMNS: &str = "SELECT id, name, description, category, builtin, recommended, \
                              requires_credentials, command, args FROM servers";

fn row_to_descriptor(row: ServerRow) -> Result<ServerDescriptor, RepositoryError> {
    let category = ServerCategory::parse(&row.category).ok_or_else(|| {
        RepositoryError::Serialization(format!(
            "unknown category '{}' for server {}",
            row.category, row.id
        ))
    })?;
    let args: Vec<String> = serde_json::from_str(&row.args).map_err(|e| {
        RepositoryError::Serialization(format!("invalid args for server {}: {e}", row.id))
    })?;

    Ok(ServerDescriptor {
        id: row.id,
        name: row.name,
        description: row.description,
        category,
        builtin: row.builtin,
        recommended: row.recommended,
        requires_credentials: row.requires_credentials,
        launch: LaunchSpec {
            command: row.command,
            args,
        },
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ServerRepository for SqliteServerRepository {
    async fn insert(&self, descriptor: &ServerDescriptor) -> Result<(), RepositoryError> {
        let args_json = serde_json::to_string(&descriptor.launch.args)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO servers (id, position, name, description, category, builtin,
                                 recommended, requires_credentials, command, args, created_at)
            VALUES (?, (SELECT COALESCE(MAX(position), 0) + 1 FROM servers),
                    ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&descriptor.id)
        .bind(&descriptor.name)
        .bind(&descriptor.description)
        .bind(descriptor.category.as_str())
        .bind(descriptor.builtin)
        .bind(descriptor.recommended)
        .bind(descriptor.requires_credentials)
        .bind(&descriptor.launch.command)
        .bind(&args_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            RepositoryError::AlreadyExists(_) => RepositoryError::AlreadyExists(descriptor.id.clone()),
            other => other,
        })?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ServerDescriptor>, RepositoryError> {
        let row = sqlx::query_as::<_, ServerRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(row_to_descriptor).transpose()
    }

    async fn list(&self) -> Result<Vec<ServerDescriptor>, RepositoryError> {
        let rows = sqlx::query_as::<_, ServerRow>(&format!("{SELECT_COLUMNS} ORDER BY position"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(row_to_descriptor).collect()
    }

    async fn update_metadata(
        &self,
        id: &str,
        description: &str,
        category: ServerCategory,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE servers SET description = ?, category = ? WHERE id = ?")
            .bind(description)
            .bind(category.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn remove_cascade(&self, id: &str) -> Result<RemovalSummary, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let removed = sqlx::query("DELETE FROM servers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();
        if removed == 0 {
            // Dropping the transaction rolls it back.
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        let secrets_deleted = sqlx::query("DELETE FROM secrets WHERE server_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        let toggle_deleted = sqlx::query("DELETE FROM server_states WHERE server_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected()
            > 0;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(RemovalSummary {
            secrets_deleted,
            toggle_deleted,
        })
    }
}
