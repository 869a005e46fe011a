//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` types in any signature
//! - No HTTP or process implementation details
//! - Repository traits are minimal and CRUD-focused
//! - Repositories move ciphertext only; encryption belongs to `SecretStore`

pub mod cipher;
pub mod event_emitter;
pub mod probe;
pub mod secret_repository;
pub mod server_repository;
pub mod supervisor;
pub mod toggle_repository;

use std::sync::Arc;

use thiserror::Error;

pub use cipher::{CipherError, LockedCipher, SecretCipher};
pub use event_emitter::{AppEventEmitter, NoopEmitter};
pub use probe::{ConnectivityProbe, NoopProbe, ProbeCredentials, ProbeOutcome};
pub use secret_repository::SecretRepository;
pub use server_repository::{RemovalSummary, ServerRepository};
pub use supervisor::{GatewayStatus, GatewaySupervisor, NoopSupervisor, ReloadError, ReloadReport};
pub use toggle_repository::ToggleStateRepository;

/// Container for all repository trait objects.
///
/// Lives in `switchyard-core` so that `GatewayCore` can accept it without
/// depending on `switchyard-db`.
///
/// ```ignore
/// let repos = switchyard_db::factory::build_repos(&pool);
/// let core = GatewayCore::new(repos, deps)?;
/// ```
#[derive(Clone)]
pub struct Repos {
    /// Server catalog.
    pub servers: Arc<dyn ServerRepository>,
    /// Encrypted credential rows.
    pub secrets: Arc<dyn SecretRepository>,
    /// Explicit enable/disable choices.
    pub toggles: Arc<dyn ToggleStateRepository>,
}

impl Repos {
    pub fn new(
        servers: Arc<dyn ServerRepository>,
        secrets: Arc<dyn SecretRepository>,
        toggles: Arc<dyn ToggleStateRepository>,
    ) -> Self {
        Self {
            servers,
            secrets,
            toggles,
        }
    }
}

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx errors)
/// and provides a clean interface for services to handle storage failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entity with the same identifier already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Storage backend unavailable or failing. Retryable.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A constraint was violated (e.g., foreign key, unique constraint).
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl RepositoryError {
    /// Whether retrying the same call may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
