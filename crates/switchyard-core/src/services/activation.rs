//! Credential submission: validate, persist, probe, optionally enable.
//!
//! Validation is all-or-nothing and happens before any write. Persisting is
//! field by field, so a storage failure can leave earlier fields committed;
//! the error names them. A connectivity probe never rolls back stored
//! secrets, it only prevents auto-enable.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::keyed_locks::KeyedLocks;
use super::reconciler::{StateReconciler, ToggleError};
use super::schema_registry::SchemaRegistry;
use super::secret_store::{SecretStore, SecretStoreError};
use crate::domain::{EffectiveServerView, SecretValue};
use crate::events::AppEvent;
use crate::ports::{
    AppEventEmitter, ConnectivityProbe, ProbeCredentials, ProbeOutcome, ServerRepository,
};

/// Coarse classification used by callers to pick a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The user must correct their input.
    UserInput,
    /// An expected refusal (credentials incomplete).
    Gating,
    /// Retry may succeed without new input.
    TransientStorage,
    Probe,
    Reload,
    Internal,
}

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("Server '{0}' not found")]
    UnknownServer(String),

    #[error("Server '{server_id}' accepts no configuration, got: {}", .keys.join(", "))]
    SchemaNotApplicable { server_id: String, keys: Vec<String> },

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Invalid format for {key}: {message}")]
    InvalidFormat { key: String, message: String },

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    /// Transient. `committed` lists the fields stored before the failure.
    #[error("Storage unavailable after storing [{}]: {reason}", .committed.join(", "))]
    StorageUnavailable {
        committed: Vec<String>,
        reason: String,
    },

    #[error("Failed to store credentials after storing [{}]: {reason}", .committed.join(", "))]
    PersistFailed {
        committed: Vec<String>,
        reason: String,
    },

    /// `stored_keys` remain persisted.
    #[error("Connectivity check failed: {reason}")]
    ProbeFailed {
        reason: String,
        stored_keys: Vec<String>,
    },

    #[error(transparent)]
    Gating(ToggleError),
}

impl ActivationError {
    /// Only storage outages can be retried without new user input.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownServer(_)
            | Self::SchemaNotApplicable { .. }
            | Self::MissingRequiredField(_)
            | Self::InvalidFormat { .. }
            | Self::UnexpectedField(_) => ErrorCategory::UserInput,
            Self::StorageUnavailable { .. } => ErrorCategory::TransientStorage,
            Self::PersistFailed { .. } => ErrorCategory::Internal,
            Self::ProbeFailed { .. } => ErrorCategory::Probe,
            Self::Gating(ToggleError::Gated { .. }) => ErrorCategory::Gating,
            Self::Gating(ToggleError::StorageUnavailable(_)) => ErrorCategory::TransientStorage,
            Self::Gating(_) => ErrorCategory::Internal,
        }
    }

    fn from_store(err: SecretStoreError, committed: Vec<String>) -> Self {
        match err {
            SecretStoreError::StorageUnavailable(reason) => {
                Self::StorageUnavailable { committed, reason }
            }
            other => Self::PersistFailed {
                committed,
                reason: other.to_string(),
            },
        }
    }
}

/// When to run the connectivity probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeMode {
    #[default]
    Skip,
    /// Probe the submitted values; nothing is stored if it fails.
    BeforePersist,
    /// Probe the stored credential set; failure keeps the secrets.
    AfterPersist,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    pub probe: ProbeMode,
    /// Enable the server after a fully successful submission.
    pub auto_enable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub server_id: String,
    /// Stored keys in schema declaration order.
    pub stored_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeOutcome>,
    /// The view after auto-enable, when it was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<EffectiveServerView>,
}

/// Validate a submission against the server's schema.
///
/// Returns the `(key, value)` pairs to store, in schema declaration order.
/// Checks run in a fixed order and stop at the first failure: missing
/// required fields, then formats, then unexpected keys.
pub fn validate_submission<'a>(
    schemas: &SchemaRegistry,
    server_id: &str,
    values: &'a BTreeMap<String, String>,
) -> Result<Vec<(&'a str, &'a str)>, ActivationError> {
    let Some(schema) = schemas.get_schema(server_id) else {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        return Err(ActivationError::SchemaNotApplicable {
            server_id: server_id.to_string(),
            keys: values.keys().cloned().collect(),
        });
    };

    let supplied = |key: &str| {
        values
            .get_key_value(key)
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    };

    if let Some(field) = schema
        .fields
        .iter()
        .find(|f| f.required && supplied(&f.key).is_none())
    {
        return Err(ActivationError::MissingRequiredField(field.key.clone()));
    }

    for field in &schema.fields {
        if let Some((_, value)) = supplied(&field.key) {
            if !schemas.matches_pattern(server_id, &field.key, value) {
                return Err(ActivationError::InvalidFormat {
                    key: field.key.clone(),
                    message: format!("{} does not have the expected format", field.label),
                });
            }
        }
    }

    if let Some(key) = values.keys().find(|k| schema.field(k).is_none()) {
        return Err(ActivationError::UnexpectedField(key.clone()));
    }

    Ok(schema
        .fields
        .iter()
        .filter_map(|f| supplied(&f.key))
        .collect())
}

pub struct ActivationPipeline {
    servers: Arc<dyn ServerRepository>,
    schemas: Arc<SchemaRegistry>,
    secrets: SecretStore,
    reconciler: Arc<StateReconciler>,
    probe: Arc<dyn ConnectivityProbe>,
    probe_timeout: Duration,
    locks: KeyedLocks,
    emitter: Arc<dyn AppEventEmitter>,
}

impl ActivationPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        servers: Arc<dyn ServerRepository>,
        schemas: Arc<SchemaRegistry>,
        secrets: SecretStore,
        reconciler: Arc<StateReconciler>,
        probe: Arc<dyn ConnectivityProbe>,
        probe_timeout: Duration,
        locks: KeyedLocks,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            servers,
            schemas,
            secrets,
            reconciler,
            probe,
            probe_timeout,
            locks,
            emitter,
        }
    }

    pub async fn submit(
        &self,
        server_id: &str,
        values: &BTreeMap<String, String>,
        options: SubmitOptions,
    ) -> Result<SubmissionOutcome, ActivationError> {
        let descriptor = self
            .servers
            .get(server_id)
            .await
            .map_err(|e| ActivationError::from_store(e.into(), Vec::new()))?
            .ok_or_else(|| ActivationError::UnknownServer(server_id.to_string()))?;

        let accepted = validate_submission(&self.schemas, &descriptor.id, values).map_err(|e| {
            tracing::debug!(server_id = %server_id, error = %e, "Rejected credential submission");
            e
        })?;

        if accepted.is_empty() {
            return Ok(SubmissionOutcome {
                server_id: descriptor.id,
                stored_keys: Vec::new(),
                probe: None,
                enabled: None,
            });
        }

        let mut probe_outcome = None;

        if options.probe == ProbeMode::BeforePersist {
            let mut credentials = self
                .stored_credentials(server_id)
                .await
                .map_err(|e| ActivationError::from_store(e, Vec::new()))?;
            for (key, value) in &accepted {
                credentials.insert((*key).to_string(), SecretValue::new(*value));
            }
            let outcome = self.run_probe(server_id, credentials).await;
            if !outcome.success {
                return Err(ActivationError::ProbeFailed {
                    reason: outcome.message,
                    stored_keys: Vec::new(),
                });
            }
            probe_outcome = Some(outcome);
        }

        let stored_keys = self.persist(server_id, &accepted).await?;
        self.emitter.emit(AppEvent::CredentialsSaved {
            server_id: server_id.to_string(),
            keys: stored_keys.clone(),
        });

        if options.probe == ProbeMode::AfterPersist {
            let credentials = self
                .stored_credentials(server_id)
                .await
                .map_err(|e| ActivationError::from_store(e, stored_keys.clone()))?;
            let outcome = self.run_probe(server_id, credentials).await;
            if !outcome.success {
                return Err(ActivationError::ProbeFailed {
                    reason: outcome.message,
                    stored_keys,
                });
            }
            probe_outcome = Some(outcome);
        }

        let enabled = if options.auto_enable {
            let view = self
                .reconciler
                .set_enabled(server_id, true)
                .await
                .map_err(|e| match e {
                    ToggleError::StorageUnavailable(reason) => ActivationError::StorageUnavailable {
                        committed: stored_keys.clone(),
                        reason,
                    },
                    other => ActivationError::Gating(other),
                })?;
            Some(view)
        } else {
            None
        };

        Ok(SubmissionOutcome {
            server_id: server_id.to_string(),
            stored_keys,
            probe: probe_outcome,
            enabled,
        })
    }

    /// Write accepted values one at a time under the server's lock.
    async fn persist(
        &self,
        server_id: &str,
        accepted: &[(&str, &str)],
    ) -> Result<Vec<String>, ActivationError> {
        let _guard = self.locks.lock(server_id).await;

        let mut committed = Vec::with_capacity(accepted.len());
        for (key, value) in accepted {
            if let Err(e) = self.secrets.put(server_id, key, value).await {
                tracing::warn!(
                    server_id = %server_id,
                    key = %key,
                    committed = ?committed,
                    error = %e,
                    "Credential submission partially stored"
                );
                return Err(ActivationError::from_store(e, committed));
            }
            committed.push((*key).to_string());
        }

        tracing::info!(server_id = %server_id, keys = ?committed, "Stored credentials");
        Ok(committed)
    }

    async fn stored_credentials(
        &self,
        server_id: &str,
    ) -> Result<BTreeMap<String, SecretValue>, SecretStoreError> {
        let keys: Vec<&str> = self
            .schemas
            .fields_of(server_id)
            .iter()
            .map(|f| f.key.as_str())
            .collect();
        self.secrets.get_many(server_id, keys).await
    }

    /// Run the probe outside any lock, bounded by the configured timeout.
    async fn run_probe(
        &self,
        server_id: &str,
        credentials: BTreeMap<String, SecretValue>,
    ) -> ProbeOutcome {
        let credentials = ProbeCredentials::new(credentials);
        let outcome = tokio::time::timeout(
            self.probe_timeout,
            self.probe.probe(server_id, &credentials),
        )
        .await
        .unwrap_or_else(|_| {
            ProbeOutcome::failed(format!(
                "Connectivity check timed out after {:?}",
                self.probe_timeout
            ))
        });

        if outcome.success {
            tracing::info!(server_id = %server_id, detail = %outcome.message, "Connectivity check passed");
        } else {
            tracing::warn!(server_id = %server_id, detail = %outcome.message, "Connectivity check failed");
        }
        outcome
    }
}
