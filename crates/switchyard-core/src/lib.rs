//! Core of switchyard: the configuration and secret reconciliation engine
//! for a gateway of tool servers.
//!
//! This crate holds the domain model, the port traits infrastructure must
//! implement, the shipped catalogs and the services that merge catalog
//! entries, stored credentials and explicit user choices into one
//! authoritative view. It contains no database, HTTP or process code.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod events;
pub mod paths;
pub mod ports;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use config::{ConfigError, GatewayConfig};
pub use domain::{
    ConfigFieldSpec, ConfigShape, EffectiveServerView, InputKind, LaunchSpec, Readiness,
    SchemaError, SecretMetadata, SecretValue, ServerCategory, ServerConfigSchema,
    ServerDescriptor, ServerStatus, ServerToggleState,
};
pub use events::AppEvent;
pub use paths::{PathError, data_root, database_path};
pub use ports::{
    AppEventEmitter, CipherError, ConnectivityProbe, GatewayStatus, GatewaySupervisor,
    NoopEmitter, ProbeCredentials, ProbeOutcome, ReloadError, ReloadReport, Repos,
    RepositoryError, SecretCipher,
};
pub use services::{
    ActivationError, ClientTarget, ConfigDocument, CoreError, ErrorCategory, GatewayCore,
    GatewayDeps, OrphanReport, ProbeMode, RegistryError, ReloadOutcome, RenderError,
    SchemaRegistry, SecretInspector, SecretStore, SecretStoreError, SubmissionOutcome,
    SubmitOptions, ToggleError,
};
