//! Gateway reload signalling.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::events::AppEvent;
use crate::ports::{AppEventEmitter, GatewayStatus, GatewaySupervisor, ReloadError};

/// Result of a reload request. A failure is a warning, never a rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReloadOutcome {
    Reloaded { detail: String },
    Failed { warning: String },
}

impl ReloadOutcome {
    fn failed(err: &ReloadError) -> Self {
        Self::Failed {
            warning: format!(
                "State saved, but the gateway reload failed ({err}). \
                 Retry the reload or restart the gateway manually."
            ),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Reloaded { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Reloaded { detail } => detail,
            Self::Failed { warning } => warning,
        }
    }
}

/// Asks the gateway to reread its configuration.
///
/// Runs independently of the reconciler and pipeline: it takes no locks.
#[derive(Clone)]
pub struct RestartCoordinator {
    supervisor: Arc<dyn GatewaySupervisor>,
    timeout: Duration,
    emitter: Arc<dyn AppEventEmitter>,
}

impl RestartCoordinator {
    pub fn new(
        supervisor: Arc<dyn GatewaySupervisor>,
        timeout: Duration,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            supervisor,
            timeout,
            emitter,
        }
    }

    pub async fn request_reload(&self) -> ReloadOutcome {
        tracing::info!(timeout_secs = self.timeout.as_secs(), "Requesting gateway reload");

        let result = tokio::time::timeout(self.timeout, self.supervisor.reload())
            .await
            .unwrap_or(Err(ReloadError::Timeout(self.timeout)));

        let outcome = match result {
            Ok(report) => {
                tracing::info!(detail = %report.detail, "Gateway reloaded");
                ReloadOutcome::Reloaded {
                    detail: report.detail,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Gateway reload failed");
                ReloadOutcome::failed(&e)
            }
        };

        self.emitter.emit(AppEvent::ReloadFinished {
            success: outcome.is_success(),
            message: outcome.message().to_string(),
        });
        outcome
    }

    /// Run [`Self::request_reload`] on a background task.
    pub fn spawn_reload(&self) -> JoinHandle<ReloadOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.request_reload().await })
    }

    pub async fn status(&self) -> GatewayStatus {
        self.supervisor.status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingEmitter, ScriptedSupervisor};

    #[tokio::test]
    async fn success_reports_detail_and_emits() {
        let emitter = RecordingEmitter::new();
        let coordinator = RestartCoordinator::new(
            Arc::new(ScriptedSupervisor::succeeding("restarted")),
            Duration::from_secs(5),
            Arc::new(emitter.clone()),
        );
        let outcome = coordinator.request_reload().await;
        assert_eq!(
            outcome,
            ReloadOutcome::Reloaded {
                detail: "restarted".into()
            }
        );
        assert!(matches!(
            emitter.events().as_slice(),
            [AppEvent::ReloadFinished { success: true, .. }]
        ));
    }

    #[tokio::test]
    async fn failure_is_a_warning() {
        let coordinator = RestartCoordinator::new(
            Arc::new(ScriptedSupervisor::failing(ReloadError::CommandFailed {
                code: Some(1),
                stderr: "no such service".into(),
            })),
            Duration::from_secs(5),
            Arc::new(RecordingEmitter::new()),
        );
        let outcome = coordinator.spawn_reload().await.unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.message().contains("restart the gateway manually"));
    }

    #[tokio::test]
    async fn hanging_supervisor_times_out() {
        let coordinator = RestartCoordinator::new(
            Arc::new(ScriptedSupervisor::hanging()),
            Duration::from_millis(20),
            Arc::new(RecordingEmitter::new()),
        );
        let outcome = coordinator.request_reload().await;
        assert!(outcome.message().contains("timed out"));
    }
}
