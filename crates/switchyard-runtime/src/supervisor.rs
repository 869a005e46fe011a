//! Command-driven gateway supervisor.
//!
//! Reloading means running one command to completion. The child is killed
//! if the caller stops waiting (the restart coordinator's timeout drops the
//! future).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use switchyard_core::{GatewayStatus, GatewaySupervisor, ReloadError, ReloadReport};

/// Longest stderr excerpt carried in a [`ReloadError::CommandFailed`].
const STDERR_EXCERPT: usize = 512;

/// Reloads the gateway by running an external command.
#[derive(Debug, Clone)]
pub struct CommandSupervisor {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    /// Command whose non-empty stdout means "running".
    status_args: Option<Vec<String>>,
}

impl CommandSupervisor {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            status_args: None,
        }
    }

    /// `docker compose restart <service>` run from `project_dir`.
    pub fn docker_compose(project_dir: &Path, service: &str) -> Self {
        Self::new("docker", ["compose", "restart", service])
            .in_dir(project_dir)
            .with_status_args(["compose", "ps", "--status", "running", "--quiet", service])
    }

    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Arguments (for the same program) of a command that prints something
    /// when the gateway is running.
    #[must_use]
    pub fn with_status_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// The reload command as a shell-like string, for messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[async_trait]
impl GatewaySupervisor for CommandSupervisor {
    async fn reload(&self) -> Result<ReloadReport, ReloadError> {
        tracing::info!(command = %self.display(), "Reloading gateway");

        let output = self
            .command(&self.args)
            .output()
            .await
            .map_err(|e| ReloadError::Spawn(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let err = ReloadError::CommandFailed {
                code: output.status.code(),
                stderr: excerpt(&output.stderr),
            };
            tracing::warn!(command = %self.display(), error = %err, "Gateway reload failed");
            return Err(err);
        }

        Ok(ReloadReport {
            detail: format!("Ran `{}`", self.display()),
        })
    }

    async fn status(&self) -> GatewayStatus {
        let Some(args) = &self.status_args else {
            return GatewayStatus::Unknown;
        };

        match self.command(args).output().await {
            Ok(output) if output.status.success() => {
                if output.stdout.iter().any(|b| !b.is_ascii_whitespace()) {
                    GatewayStatus::Running
                } else {
                    GatewayStatus::Stopped
                }
            }
            Ok(output) => {
                tracing::debug!(code = ?output.status.code(), "Gateway status command failed");
                GatewayStatus::Unknown
            }
            Err(e) => {
                tracing::debug!(error = %e, "Gateway status command could not start");
                GatewayStatus::Unknown
            }
        }
    }
}
