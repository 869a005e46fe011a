//! Gateway supervisor port.
//!
//! The supervisor tells the external gateway process to reread its
//! configuration. The core never manages that process beyond this signal.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Coarse state of the gateway process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Running,
    Stopped,
    Unknown,
}

/// What a successful reload reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    pub detail: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReloadError {
    #[error("Reload timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Reload command failed (exit code {code:?}): {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error("Failed to start reload command: {0}")]
    Spawn(String),
}

#[async_trait]
pub trait GatewaySupervisor: Send + Sync {
    /// Ask the gateway to restart with the current configuration.
    async fn reload(&self) -> Result<ReloadReport, ReloadError>;

    async fn status(&self) -> GatewayStatus;
}

/// Supervisor for setups without a managed gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSupervisor;

#[async_trait]
impl GatewaySupervisor for NoopSupervisor {
    async fn reload(&self) -> Result<ReloadReport, ReloadError> {
        Ok(ReloadReport {
            detail: "No gateway configured; nothing to reload".to_string(),
        })
    }

    async fn status(&self) -> GatewayStatus {
        GatewayStatus::Unknown
    }
}
