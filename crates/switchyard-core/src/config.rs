//! Runtime configuration read from the environment.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::paths::{self, DATA_DIR_ENV, PathError};

pub const MASTER_KEY_ENV: &str = "SWITCHYARD_MASTER_KEY";
pub const PROJECT_ROOT_ENV: &str = "SWITCHYARD_PROJECT_ROOT";
pub const GATEWAY_SERVICE_ENV: &str = "SWITCHYARD_GATEWAY_SERVICE";
pub const RELOAD_TIMEOUT_ENV: &str = "SWITCHYARD_RELOAD_TIMEOUT_SECS";
pub const PROBE_TIMEOUT_ENV: &str = "SWITCHYARD_PROBE_TIMEOUT_SECS";

pub const DEFAULT_GATEWAY_SERVICE: &str = "mcp-gateway";
pub const DEFAULT_RELOAD_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Everything the composition root needs to wire a `GatewayCore`.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub data_dir: PathBuf,
    /// Absent means the secret store is locked.
    pub master_key: Option<String>,
    /// Directory of the compose project the gateway runs in.
    pub project_root: PathBuf,
    pub gateway_service: String,
    pub reload_timeout: Duration,
    pub probe_timeout: Duration,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("data_dir", &self.data_dir)
            .field("master_key", &self.master_key.as_ref().map(|_| "<set>"))
            .field("project_root", &self.project_root)
            .field("gateway_service", &self.gateway_service)
            .field("reload_timeout", &self.reload_timeout)
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let data_dir = paths::resolve_data_root(non_empty(DATA_DIR_ENV).as_deref())?;
        let project_root = non_empty(PROJECT_ROOT_ENV)
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        let gateway_service =
            non_empty(GATEWAY_SERVICE_ENV).unwrap_or_else(|| DEFAULT_GATEWAY_SERVICE.to_string());

        Ok(Self {
            data_dir,
            master_key: non_empty(MASTER_KEY_ENV),
            project_root,
            gateway_service,
            reload_timeout: parse_secs(
                RELOAD_TIMEOUT_ENV,
                non_empty(RELOAD_TIMEOUT_ENV),
                DEFAULT_RELOAD_TIMEOUT_SECS,
            )?,
            probe_timeout: parse_secs(
                PROBE_TIMEOUT_ENV,
                non_empty(PROBE_TIMEOUT_ENV),
                DEFAULT_PROBE_TIMEOUT_SECS,
            )?,
        })
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(paths::database_path_in(&self.data_dir)?)
    }
}

fn parse_secs(
    var: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            var,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidValue {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
