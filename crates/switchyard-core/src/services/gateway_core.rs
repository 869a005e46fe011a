//! `GatewayCore` - the primary application facade.
//!
//! This is the composition root for core services. Adapters (CLI, web)
//! receive a `GatewayCore` and use it to access all functionality.

use std::sync::Arc;
use std::time::Duration;

use super::activation::ActivationPipeline;
use super::keyed_locks::KeyedLocks;
use super::reconciler::{StateReconciler, ToggleError};
use super::renderer::{ClientTarget, ConfigDocument, ConfigRenderer, RenderError};
use super::restart::RestartCoordinator;
use super::schema_registry::SchemaRegistry;
use super::secret_store::{SecretInspector, SecretStore};
use super::server_registry::ServerRegistry;
use crate::config::{DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_RELOAD_TIMEOUT_SECS};
use crate::ports::{
    AppEventEmitter, ConnectivityProbe, GatewaySupervisor, NoopEmitter, NoopProbe,
    NoopSupervisor, Repos, SecretCipher,
};

/// Non-repository collaborators of the core.
#[derive(Clone)]
pub struct GatewayDeps {
    pub cipher: Arc<dyn SecretCipher>,
    pub probe: Arc<dyn ConnectivityProbe>,
    pub supervisor: Arc<dyn GatewaySupervisor>,
    pub emitter: Arc<dyn AppEventEmitter>,
    pub schemas: Arc<SchemaRegistry>,
    pub probe_timeout: Duration,
    pub reload_timeout: Duration,
}

impl GatewayDeps {
    /// Defaults: no probes, no supervisor, no events.
    pub fn new(cipher: Arc<dyn SecretCipher>, schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            cipher,
            probe: Arc::new(NoopProbe),
            supervisor: Arc::new(NoopSupervisor),
            emitter: Arc::new(NoopEmitter::new()),
            schemas,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            reload_timeout: Duration::from_secs(DEFAULT_RELOAD_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn with_supervisor(mut self, supervisor: Arc<dyn GatewaySupervisor>) -> Self {
        self.supervisor = supervisor;
        self
    }

    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn AppEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    #[must_use]
    pub const fn with_timeouts(mut self, probe: Duration, reload: Duration) -> Self {
        self.probe_timeout = probe;
        self.reload_timeout = reload;
        self
    }
}

/// The core application facade.
///
/// ```ignore
/// let repos = switchyard_db::factory::build_repos(&pool);
/// let deps = GatewayDeps::new(cipher, Arc::new(SchemaRegistry::builtin()?));
/// let core = GatewayCore::new(repos, deps);
///
/// let views = core.reconciler().list().await?;
/// ```
pub struct GatewayCore {
    schemas: Arc<SchemaRegistry>,
    secrets: SecretStore,
    registry: ServerRegistry,
    reconciler: Arc<StateReconciler>,
    activation: ActivationPipeline,
    renderer: ConfigRenderer,
    restart: RestartCoordinator,
}

impl GatewayCore {
    pub fn new(repos: Repos, deps: GatewayDeps) -> Self {
        let locks = KeyedLocks::new();
        let secrets =
            SecretStore::new(Arc::clone(&repos.secrets), deps.cipher).with_locks(locks.clone());

        let registry = ServerRegistry::new(
            Arc::clone(&repos.servers),
            Arc::clone(&repos.secrets),
            Arc::clone(&repos.toggles),
            locks.clone(),
            Arc::clone(&deps.emitter),
        );
        let reconciler = Arc::new(StateReconciler::new(
            Arc::clone(&repos.servers),
            Arc::clone(&repos.toggles),
            Arc::clone(&deps.schemas),
            secrets.inspector(),
            locks.clone(),
            Arc::clone(&deps.emitter),
        ));
        let activation = ActivationPipeline::new(
            Arc::clone(&repos.servers),
            Arc::clone(&deps.schemas),
            secrets.clone(),
            Arc::clone(&reconciler),
            deps.probe,
            deps.probe_timeout,
            locks,
            Arc::clone(&deps.emitter),
        );
        let renderer = ConfigRenderer::new(Arc::clone(&deps.schemas), secrets.clone());
        let restart = RestartCoordinator::new(deps.supervisor, deps.reload_timeout, deps.emitter);

        Self {
            schemas: deps.schemas,
            secrets,
            registry,
            reconciler,
            activation,
            renderer,
            restart,
        }
    }

    pub const fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    /// Trusted secret access. Adapters facing untrusted callers should use
    /// [`Self::inspector`] instead.
    pub const fn secrets(&self) -> &SecretStore {
        &self.secrets
    }

    pub fn inspector(&self) -> SecretInspector {
        self.secrets.inspector()
    }

    pub const fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn reconciler(&self) -> &StateReconciler {
        &self.reconciler
    }

    pub const fn activation(&self) -> &ActivationPipeline {
        &self.activation
    }

    pub const fn renderer(&self) -> &ConfigRenderer {
        &self.renderer
    }

    pub const fn restart(&self) -> &RestartCoordinator {
        &self.restart
    }

    /// Render the current effective state for a client.
    pub async fn render_current(&self, target: ClientTarget) -> Result<ConfigDocument, CoreError> {
        let views = self.reconciler.list().await?;
        Ok(self.renderer.render(target, &views).await?)
    }
}

/// Errors from facade helpers that span services.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Toggle(#[from] ToggleError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
