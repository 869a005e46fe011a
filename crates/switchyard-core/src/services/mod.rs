//! Core services.
//!
//! Services orchestrate domain logic over the ports. They hold no
//! infrastructure details: repositories, the cipher, probes and the gateway
//! supervisor are all injected.

mod activation;
mod gateway_core;
mod keyed_locks;
mod reconciler;
mod renderer;
mod restart;
mod schema_registry;
mod secret_store;
mod server_registry;

pub use activation::{
    ActivationError, ActivationPipeline, ErrorCategory, ProbeMode, SubmissionOutcome,
    SubmitOptions, validate_submission,
};
pub use gateway_core::{CoreError, GatewayCore, GatewayDeps};
pub use keyed_locks::KeyedLocks;
pub use reconciler::{StateReconciler, ToggleError};
pub use renderer::{
    ClientTarget, ConfigDocument, ConfigRenderer, RenderError, RenderedServer, render_document,
};
pub use restart::{ReloadOutcome, RestartCoordinator};
pub use schema_registry::SchemaRegistry;
pub use secret_store::{SecretInspector, SecretStore, SecretStoreError};
pub use server_registry::{OrphanReport, RegistryError, ServerRegistry};
