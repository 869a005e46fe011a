//! Composition utilities for building `GatewayCore` with `SQLite` backends.
//!
//! This module is focused purely on construction and holds no domain logic.

use sqlx::SqlitePool;
use std::sync::Arc;

use switchyard_core::{GatewayCore, GatewayDeps, Repos};

use crate::repositories::{
    SqliteSecretRepository, SqliteServerRepository, SqliteToggleStateRepository,
};

/// Factory for creating repository instances with `SQLite` backends.
pub struct CoreFactory;

impl CoreFactory {
    /// Create a `SQLite` connection pool.
    ///
    /// # Arguments
    ///
    /// * `db_url` - `SQLite` connection URL (e.g., "sqlite:/srv/switchyard/data/switchyard.db")
    pub async fn create_pool(db_url: &str) -> anyhow::Result<SqlitePool> {
        let pool = SqlitePool::connect(db_url).await?;
        Ok(pool)
    }

    /// Build all `SQLite` repositories from a pool.
    ///
    /// Returns a `Repos` struct from `switchyard-core` containing
    /// trait-object-wrapped repositories.
    pub fn build_repos(pool: SqlitePool) -> Repos {
        Repos::new(
            Arc::new(SqliteServerRepository::new(pool.clone())),
            Arc::new(SqliteSecretRepository::new(pool.clone())),
            Arc::new(SqliteToggleStateRepository::new(pool)),
        )
    }

    /// Build a complete `GatewayCore` from a pool and its collaborators.
    ///
    /// Equivalent to:
    ///
    /// ```ignore
    /// let repos = CoreFactory::build_repos(pool);
    /// let core = GatewayCore::new(repos, deps);
    /// ```
    pub fn build_gateway_core(pool: SqlitePool, deps: GatewayDeps) -> GatewayCore {
        GatewayCore::new(Self::build_repos(pool), deps)
    }
}

/// Test database helper for integration tests.
///
/// Provides an in-memory `SQLite` database with the production schema
/// already applied.
#[cfg(any(test, feature = "test-utils"))]
pub struct TestDb {
    pool: SqlitePool,
}

#[cfg(any(test, feature = "test-utils"))]
impl TestDb {
    /// Create a new in-memory test database with full schema.
    pub async fn new() -> anyhow::Result<Self> {
        let pool = crate::setup::setup_test_database().await?;
        Ok(Self { pool })
    }

    /// Get the underlying pool.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// All repositories over this database.
    pub fn repos(&self) -> Repos {
        CoreFactory::build_repos(self.pool.clone())
    }

    pub fn server_repository(&self) -> SqliteServerRepository {
        SqliteServerRepository::new(self.pool.clone())
    }

    pub fn secret_repository(&self) -> SqliteSecretRepository {
        SqliteSecretRepository::new(self.pool.clone())
    }

    pub fn toggle_repository(&self) -> SqliteToggleStateRepository {
        SqliteToggleStateRepository::new(self.pool.clone())
    }
}
