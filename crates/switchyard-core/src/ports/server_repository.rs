//! Server catalog repository trait.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{ServerCategory, ServerDescriptor};

/// What a cascading removal deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    pub secrets_deleted: u64,
    pub toggle_deleted: bool,
}

/// Repository for server descriptors.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Insert a new descriptor.
    ///
    /// Returns `AlreadyExists` if the id is taken.
    async fn insert(&self, descriptor: &ServerDescriptor) -> Result<(), RepositoryError>;

    /// Get a descriptor by id.
    async fn get(&self, id: &str) -> Result<Option<ServerDescriptor>, RepositoryError>;

    /// List all descriptors in insertion order.
    async fn list(&self) -> Result<Vec<ServerDescriptor>, RepositoryError>;

    /// Update presentation metadata.
    ///
    /// Returns `NotFound` if the id does not exist.
    async fn update_metadata(
        &self,
        id: &str,
        description: &str,
        category: ServerCategory,
    ) -> Result<(), RepositoryError>;

    /// Delete a descriptor together with its secrets and toggle state.
    ///
    /// Either all three deletions happen or none do. Returns `NotFound` if
    /// the descriptor does not exist.
    async fn remove_cascade(&self, id: &str) -> Result<RemovalSummary, RepositoryError>;
}
