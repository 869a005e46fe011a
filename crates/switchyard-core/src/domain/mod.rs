//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (database, cipher, process supervision).
//!
//! # Structure
//!
//! - `server` - Catalog entries (`ServerDescriptor`, `LaunchSpec`)
//! - `schema` - Credential schemas (`ServerConfigSchema`, `ConfigFieldSpec`)
//! - `secret` - Encrypted records and redacted values
//! - `state` - Explicit enable/disable choices
//! - `view` - Derived readiness and status

mod schema;
mod secret;
mod server;
mod state;
mod view;

pub use schema::{ConfigFieldSpec, ConfigShape, InputKind, SchemaError, ServerConfigSchema};
pub use secret::{SECRET_MASK, SecretMetadata, SecretRecord, SecretValue};
pub use server::{LaunchSpec, ServerCategory, ServerDescriptor};
pub use state::ServerToggleState;
pub use view::{EffectiveServerView, Readiness, ServerStatus, compute_readiness};
