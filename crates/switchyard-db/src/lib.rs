//! `SQLite` persistence for switchyard.
//!
//! Implements the repository ports of `switchyard-core` over a single
//! `SQLite` file: the server catalog, encrypted secrets and explicit toggle
//! states. The pool never leaves this crate through a port signature.

#![deny(unsafe_code)]

pub mod factory;
pub mod repositories;
pub mod setup;

// Re-export factory for convenient access
pub use factory::CoreFactory;

// Re-export TestDb for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub use factory::TestDb;

// Re-export repository implementations
pub use repositories::{
    SqliteSecretRepository, SqliteServerRepository, SqliteToggleStateRepository,
};

// Re-export setup functions for convenient access
pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
