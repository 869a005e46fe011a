//! The state reconciler.
//!
//! Merges descriptors, schemas, stored credential keys and explicit toggles
//! into one [`EffectiveServerView`] per server, and owns the single write
//! path for toggle state.
//!
//! Precedence for `enabled`, highest first:
//!
//! 1. A stored toggle.
//! 2. `descriptor.recommended`.
//!
//! Readiness is computed independently. Enabling a server that is not ready
//! is rejected before anything is written.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::keyed_locks::KeyedLocks;
use super::schema_registry::SchemaRegistry;
use super::secret_store::{SecretInspector, SecretStoreError};
use crate::domain::{EffectiveServerView, Readiness, ServerDescriptor, ServerToggleState};
use crate::events::AppEvent;
use crate::ports::{AppEventEmitter, RepositoryError, ServerRepository, ToggleStateRepository};

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("Server '{0}' not found")]
    UnknownServer(String),

    /// Expected condition, not a fault: credentials are incomplete.
    #[error(
        "Cannot enable '{server_id}': missing required credentials {}",
        .missing.join(", ")
    )]
    Gated {
        server_id: String,
        readiness: Readiness,
        missing: Vec<String>,
    },

    /// Transient; retrying may succeed.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl ToggleError {
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl From<RepositoryError> for ToggleError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Storage(msg) => Self::StorageUnavailable(msg),
            other => Self::Repository(other),
        }
    }
}

impl From<SecretStoreError> for ToggleError {
    fn from(err: SecretStoreError) -> Self {
        match err {
            SecretStoreError::StorageUnavailable(msg) => Self::StorageUnavailable(msg),
            SecretStoreError::Repository(e) => Self::Repository(e),
            other => Self::StorageUnavailable(other.to_string()),
        }
    }
}

pub struct StateReconciler {
    servers: Arc<dyn ServerRepository>,
    toggles: Arc<dyn ToggleStateRepository>,
    schemas: Arc<SchemaRegistry>,
    inspector: SecretInspector,
    locks: KeyedLocks,
    emitter: Arc<dyn AppEventEmitter>,
}

impl StateReconciler {
    pub fn new(
        servers: Arc<dyn ServerRepository>,
        toggles: Arc<dyn ToggleStateRepository>,
        schemas: Arc<SchemaRegistry>,
        inspector: SecretInspector,
        locks: KeyedLocks,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            servers,
            toggles,
            schemas,
            inspector,
            locks,
            emitter,
        }
    }

    /// Effective views for every server, in declaration order.
    pub async fn list(&self) -> Result<Vec<EffectiveServerView>, ToggleError> {
        let descriptors = self.servers.list().await?;
        let mut toggles: HashMap<String, ServerToggleState> = self
            .toggles
            .list()
            .await?
            .into_iter()
            .map(|t| (t.server_id.clone(), t))
            .collect();

        let mut views = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let toggle = toggles.remove(&descriptor.id);
            views.push(self.compute(descriptor, toggle.as_ref()).await?);
        }

        if !toggles.is_empty() {
            tracing::warn!(
                orphans = ?toggles.keys().collect::<Vec<_>>(),
                "Ignoring toggle state for unregistered servers"
            );
        }
        tracing::debug!(count = views.len(), "Computed effective server views");
        Ok(views)
    }

    pub async fn view(&self, server_id: &str) -> Result<EffectiveServerView, ToggleError> {
        let descriptor = self.descriptor(server_id).await?;
        let toggle = self.toggles.get(server_id).await?;
        self.compute(descriptor, toggle.as_ref()).await
    }

    /// Persist an explicit choice for one server.
    ///
    /// The gating check and the write happen under the server's lock. When
    /// the stored choice already equals `enabled`, nothing is written.
    pub async fn set_enabled(
        &self,
        server_id: &str,
        enabled: bool,
    ) -> Result<EffectiveServerView, ToggleError> {
        let _guard = self.locks.lock(server_id).await;

        let descriptor = self.descriptor(server_id).await?;
        let toggle = self.toggles.get(server_id).await?;
        let current = self.compute(descriptor, toggle.as_ref()).await?;

        if enabled && !current.readiness.is_ready() {
            tracing::info!(
                server_id = %server_id,
                readiness = current.readiness.as_str(),
                missing = ?current.missing_keys,
                "Refused to enable server with incomplete credentials"
            );
            return Err(ToggleError::Gated {
                server_id: server_id.to_string(),
                readiness: current.readiness,
                missing: current.missing_keys,
            });
        }

        if toggle.as_ref().is_some_and(|t| t.enabled == enabled) {
            tracing::debug!(server_id = %server_id, enabled, "Toggle already in requested state");
            return Ok(current);
        }

        let stored = self.toggles.upsert(server_id, enabled).await?;
        let view = self.compute(current.descriptor, Some(&stored)).await?;

        tracing::info!(
            server_id = %server_id,
            enabled,
            status = view.status.as_str(),
            "Updated server toggle"
        );
        self.emitter.emit(AppEvent::ServerToggled {
            server_id: server_id.to_string(),
            enabled: view.enabled,
            status: view.status,
        });
        Ok(view)
    }

    /// Remove the explicit choice so the recommended default applies again.
    pub async fn clear_override(&self, server_id: &str) -> Result<EffectiveServerView, ToggleError> {
        let _guard = self.locks.lock(server_id).await;

        let descriptor = self.descriptor(server_id).await?;
        let deleted = self.toggles.delete(server_id).await?;
        let view = self.compute(descriptor, None).await?;

        if deleted {
            tracing::info!(server_id = %server_id, enabled = view.enabled, "Cleared server toggle");
            self.emitter.emit(AppEvent::ServerToggled {
                server_id: server_id.to_string(),
                enabled: view.enabled,
                status: view.status,
            });
        }
        Ok(view)
    }

    async fn descriptor(&self, server_id: &str) -> Result<ServerDescriptor, ToggleError> {
        self.servers
            .get(server_id)
            .await?
            .ok_or_else(|| ToggleError::UnknownServer(server_id.to_string()))
    }

    async fn compute(
        &self,
        descriptor: ServerDescriptor,
        toggle: Option<&ServerToggleState>,
    ) -> Result<EffectiveServerView, ToggleError> {
        let stored_keys = self.inspector.list_keys(&descriptor.id).await?;
        let schema = self.schemas.get_schema(&descriptor.id);
        Ok(EffectiveServerView::compute(
            descriptor,
            schema,
            &stored_keys,
            toggle,
        ))
    }
}
