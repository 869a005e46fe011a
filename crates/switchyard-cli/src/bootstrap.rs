//! CLI bootstrap - the composition root.
//!
//! This module is the only place where infrastructure is wired together
//! for the CLI adapter:
//! - Database pool and repositories (via switchyard-db)
//! - Secret cipher (via switchyard-crypto)
//! - Connectivity probe and gateway supervisor (via switchyard-runtime)
//!
//! Command handlers receive the composed `GatewayCore` and delegate to it.

use std::sync::Arc;

use anyhow::{Context, Result};

use switchyard_core::catalog::builtin_servers;
use switchyard_core::config::MASTER_KEY_ENV;
use switchyard_core::paths::DATA_DIR_ENV;
use switchyard_core::ports::{LockedCipher, SecretCipher};
use switchyard_core::{GatewayConfig, GatewayCore, GatewayDeps, SchemaRegistry};
use switchyard_crypto::AesGcmCipher;
use switchyard_db::{CoreFactory, setup_database};
use switchyard_runtime::{CommandSupervisor, HttpConnectivityProbe};

use crate::error::CliError;

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub core: GatewayCore,
    pub config: GatewayConfig,
}

impl CliContext {
    /// Access the core facade.
    pub const fn core(&self) -> &GatewayCore {
        &self.core
    }

    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Fail early for commands that must read or write secret values.
    pub fn require_unlocked(&self) -> Result<(), CliError> {
        if self.config.master_key.is_some() {
            Ok(())
        } else {
            Err(CliError::Config(format!(
                "no master key configured. Set {MASTER_KEY_ENV} (generate one with `switchyard keygen`)"
            )))
        }
    }
}

/// Read configuration from the environment, applying a `--data-dir` override.
pub fn load_config(data_dir: Option<&str>) -> Result<GatewayConfig, CliError> {
    let config = GatewayConfig::from_lookup(|var| {
        if var == DATA_DIR_ENV {
            if let Some(dir) = data_dir {
                return Some(dir.to_string());
            }
        }
        std::env::var(var).ok()
    })?;
    Ok(config)
}

/// Bootstrap the CLI application.
///
/// Opens the database, builds the cipher (locked when no master key is
/// set), the HTTP probe and the docker compose supervisor, assembles the
/// `GatewayCore` and seeds the shipped server catalog.
pub async fn bootstrap(config: GatewayConfig) -> Result<CliContext> {
    let db_path = config.database_path().map_err(CliError::from)?;
    let pool = setup_database(&db_path).await?;

    let cipher: Arc<dyn SecretCipher> = match config.master_key.as_deref() {
        Some(key) => Arc::new(
            AesGcmCipher::from_master_key(key)
                .map_err(|e| CliError::Config(format!("{MASTER_KEY_ENV}: {e}")))?,
        ),
        None => {
            tracing::warn!(
                "{MASTER_KEY_ENV} is not set; credentials can be listed but not read or written"
            );
            Arc::new(LockedCipher)
        }
    };

    let probe = HttpConnectivityProbe::new(config.probe_timeout)
        .context("Failed to build HTTP client for connectivity checks")?;
    let supervisor =
        CommandSupervisor::docker_compose(&config.project_root, &config.gateway_service);

    let schemas = SchemaRegistry::builtin().context("Shipped credential schemas are invalid")?;
    let deps = GatewayDeps::new(cipher, Arc::new(schemas))
        .with_probe(Arc::new(probe))
        .with_supervisor(Arc::new(supervisor))
        .with_timeouts(config.probe_timeout, config.reload_timeout);

    let core = CoreFactory::build_gateway_core(pool, deps);
    let seeded = core
        .registry()
        .seed_catalog(&builtin_servers())
        .await
        .map_err(CliError::from)?;
    tracing::debug!(seeded, db = %db_path.display(), "Bootstrapped gateway core");

    Ok(bootstrap_with(core, config))
}

/// Wrap an already composed core (for testing).
pub const fn bootstrap_with(core: GatewayCore, config: GatewayConfig) -> CliContext {
    CliContext { core, config }
}
