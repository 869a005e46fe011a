//! Toggle state repository trait.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::ServerToggleState;

/// Repository for explicit enable/disable choices, one row per server.
#[async_trait]
pub trait ToggleStateRepository: Send + Sync {
    async fn get(&self, server_id: &str) -> Result<Option<ServerToggleState>, RepositoryError>;

    async fn list(&self) -> Result<Vec<ServerToggleState>, RepositoryError>;

    /// Insert or overwrite the row for `server_id`.
    async fn upsert(
        &self,
        server_id: &str,
        enabled: bool,
    ) -> Result<ServerToggleState, RepositoryError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, server_id: &str) -> Result<bool, RepositoryError>;
}
