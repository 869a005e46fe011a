//! Server catalog management.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::keyed_locks::KeyedLocks;
use crate::domain::{ServerCategory, ServerDescriptor};
use crate::events::AppEvent;
use crate::ports::{
    AppEventEmitter, RemovalSummary, RepositoryError, SecretRepository, ServerRepository,
    ToggleStateRepository,
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Server '{0}' already exists")]
    AlreadyExists(String),

    #[error("Server '{0}' is declared built-in; only custom servers can be added")]
    BuiltinRejected(String),

    #[error("Server '{0}' is built-in and cannot be removed")]
    NotRemovable(String),

    #[error("Server '{0}' not found")]
    NotFound(String),

    #[error("Invalid server descriptor: {0}")]
    InvalidDescriptor(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl RegistryError {
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Repository(e) if e.is_transient())
    }
}

impl From<RepositoryError> for RegistryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::AlreadyExists(id) => Self::AlreadyExists(id),
            RepositoryError::NotFound(id) => Self::NotFound(id),
            other => Self::Repository(other),
        }
    }
}

/// Server ids referenced by secrets or toggles but absent from the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrphanReport {
    pub secret_server_ids: Vec<String>,
    pub toggle_server_ids: Vec<String>,
}

impl OrphanReport {
    pub fn is_empty(&self) -> bool {
        self.secret_server_ids.is_empty() && self.toggle_server_ids.is_empty()
    }
}

/// The authoritative list of known servers.
pub struct ServerRegistry {
    servers: Arc<dyn ServerRepository>,
    secrets: Arc<dyn SecretRepository>,
    toggles: Arc<dyn ToggleStateRepository>,
    locks: KeyedLocks,
    emitter: Arc<dyn AppEventEmitter>,
}

impl ServerRegistry {
    pub fn new(
        servers: Arc<dyn ServerRepository>,
        secrets: Arc<dyn SecretRepository>,
        toggles: Arc<dyn ToggleStateRepository>,
        locks: KeyedLocks,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            servers,
            secrets,
            toggles,
            locks,
            emitter,
        }
    }

    /// All servers in declaration order.
    pub async fn list(&self) -> Result<Vec<ServerDescriptor>, RegistryError> {
        Ok(self.servers.list().await?)
    }

    pub async fn find(&self, id: &str) -> Result<Option<ServerDescriptor>, RegistryError> {
        Ok(self.servers.get(id).await?)
    }

    /// Add a custom server.
    pub async fn add(&self, descriptor: ServerDescriptor) -> Result<ServerDescriptor, RegistryError> {
        if descriptor.builtin {
            return Err(RegistryError::BuiltinRejected(descriptor.id));
        }
        descriptor
            .validate()
            .map_err(RegistryError::InvalidDescriptor)?;

        let _guard = self.locks.lock(&descriptor.id).await;
        self.servers.insert(&descriptor).await?;

        tracing::info!(server_id = %descriptor.id, name = %descriptor.name, "Added server");
        self.emitter.emit(AppEvent::ServerAdded {
            server_id: descriptor.id.clone(),
            name: descriptor.name.clone(),
        });
        Ok(descriptor)
    }

    /// Remove a custom server with its secrets and toggle state.
    pub async fn remove(&self, id: &str) -> Result<RemovalSummary, RegistryError> {
        let guard = self.locks.lock(id).await;

        let descriptor = self
            .servers
            .get(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if descriptor.builtin {
            return Err(RegistryError::NotRemovable(id.to_string()));
        }

        let summary = self.servers.remove_cascade(id).await?;
        drop(guard);
        self.locks.forget(id);

        tracing::info!(
            server_id = %id,
            secrets_deleted = summary.secrets_deleted,
            toggle_deleted = summary.toggle_deleted,
            "Removed server"
        );
        self.emitter.emit(AppEvent::ServerRemoved {
            server_id: id.to_string(),
            secrets_deleted: summary.secrets_deleted,
        });
        Ok(summary)
    }

    pub async fn update_metadata(
        &self,
        id: &str,
        description: &str,
        category: ServerCategory,
    ) -> Result<(), RegistryError> {
        self.servers
            .update_metadata(id, description, category)
            .await?;
        tracing::debug!(server_id = %id, %category, "Updated server metadata");
        Ok(())
    }

    /// Insert catalog entries that are not present yet.
    ///
    /// Existing entries are left untouched. Returns the number inserted.
    pub async fn seed_catalog(&self, catalog: &[ServerDescriptor]) -> Result<usize, RegistryError> {
        let existing: HashSet<String> = self
            .servers
            .list()
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

        let mut inserted = 0;
        for descriptor in catalog.iter().filter(|d| !existing.contains(&d.id)) {
            match self.servers.insert(descriptor).await {
                Ok(()) => inserted += 1,
                // Lost a race with a concurrent seeder.
                Err(RepositoryError::AlreadyExists(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        if inserted > 0 {
            tracing::info!(inserted, "Seeded server catalog");
        }
        Ok(inserted)
    }

    /// Find secrets and toggles that point at servers no longer registered.
    pub async fn orphans(&self) -> Result<OrphanReport, RegistryError> {
        let known: HashSet<String> = self
            .servers
            .list()
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

        let secret_server_ids: Vec<String> = self
            .secrets
            .server_ids()
            .await?
            .into_iter()
            .filter(|id| !known.contains(id))
            .collect();

        let mut toggle_server_ids: Vec<String> = self
            .toggles
            .list()
            .await?
            .into_iter()
            .map(|t| t.server_id)
            .filter(|id| !known.contains(id))
            .collect();
        toggle_server_ids.sort();

        let report = OrphanReport {
            secret_server_ids,
            toggle_server_ids,
        };
        if !report.is_empty() {
            tracing::warn!(
                secrets = ?report.secret_server_ids,
                toggles = ?report.toggle_server_ids,
                "Found state for unregistered servers"
            );
        }
        Ok(report)
    }
}
