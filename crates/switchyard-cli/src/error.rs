//! CLI-specific error types and mappings.
//!
//! Maps core errors to exit codes and user-facing messages.

use switchyard_core::{
    ActivationError, ConfigError, CoreError, ErrorCategory, RegistryError, RenderError,
    SecretStoreError, ToggleError,
};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad input: unknown server, invalid credential, and so on.
    #[error("{0}")]
    Input(String),

    /// The server cannot be enabled yet.
    #[error("{0}")]
    Gated(String),

    /// Storage is busy or unreachable; retrying may work.
    #[error("{0} (retry may succeed)")]
    Unavailable(String),

    /// Connectivity check failed.
    #[error("{0}")]
    Probe(String),

    /// The gateway could not be reloaded.
    #[error("{0}")]
    Reload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

impl CliError {
    /// Map error to an exit code (sysexits.h where one fits).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Input(_) => 65,       // EX_DATAERR
            Self::Gated(_) => 77,       // EX_NOPERM
            Self::Unavailable(_) => 75, // EX_TEMPFAIL
            Self::Probe(_) | Self::Reload(_) => 69, // EX_UNAVAILABLE
            Self::Config(_) => 78,      // EX_CONFIG
            Self::Internal(_) => 70,    // EX_SOFTWARE
        }
    }

    fn categorized(category: ErrorCategory, message: String) -> Self {
        match category {
            ErrorCategory::UserInput => Self::Input(message),
            ErrorCategory::Gating => Self::Gated(message),
            ErrorCategory::TransientStorage => Self::Unavailable(message),
            ErrorCategory::Probe => Self::Probe(message),
            ErrorCategory::Reload => Self::Reload(message),
            ErrorCategory::Internal => Self::Internal(message),
        }
    }
}

/// Exit code for any error bubbled up to `main`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}

impl From<ActivationError> for CliError {
    fn from(err: ActivationError) -> Self {
        let message = match &err {
            ActivationError::ProbeFailed { stored_keys, .. } if !stored_keys.is_empty() => {
                format!("{err}. Credentials were stored; the server was not enabled.")
            }
            _ => err.to_string(),
        };
        Self::categorized(err.category(), message)
    }
}

impl From<ToggleError> for CliError {
    fn from(err: ToggleError) -> Self {
        match err {
            ToggleError::UnknownServer(_) => Self::Input(err.to_string()),
            ToggleError::Gated { ref server_id, .. } => Self::Gated(format!(
                "{err}. Store them with: switchyard configure {server_id} KEY=VALUE ..."
            )),
            ToggleError::StorageUnavailable(_) => Self::Unavailable(err.to_string()),
            ToggleError::Repository(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        if err.is_retryable() {
            return Self::Unavailable(err.to_string());
        }
        match err {
            RegistryError::Repository(_) => Self::Internal(err.to_string()),
            _ => Self::Input(err.to_string()),
        }
    }
}

impl From<SecretStoreError> for CliError {
    fn from(err: SecretStoreError) -> Self {
        match err {
            SecretStoreError::NotFound { .. } => Self::Input(err.to_string()),
            SecretStoreError::StorageUnavailable(_) => Self::Unavailable(err.to_string()),
            SecretStoreError::Cipher(_) => Self::Config(err.to_string()),
            SecretStoreError::Repository(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Toggle(e) => e.into(),
            CoreError::Render(RenderError::SecretUnavailable { server_id, source }) => {
                let message = format!("Cannot read credentials for '{server_id}': {source}");
                match source {
                    SecretStoreError::Cipher(_) => Self::Config(message),
                    SecretStoreError::StorageUnavailable(_) => Self::Unavailable(message),
                    _ => Self::Internal(message),
                }
            }
            CoreError::Render(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
