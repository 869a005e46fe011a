//! Repository implementations using `SQLite`.
//!
//! These implementations encapsulate all SQL queries and database access.
//! The `SqlitePool` is confined to this module and never exposed through
//! the port trait signatures.

mod sqlite_secret_repository;
mod sqlite_server_repository;
mod sqlite_toggle_repository;

pub use sqlite_secret_repository::SqliteSecretRepository;
pub use sqlite_server_repository::SqliteServerRepository;
pub use sqlite_toggle_repository::SqliteToggleStateRepository;

use switchyard_core::RepositoryError;

/// Map `SQLx` errors to `RepositoryError`.
///
/// Busy, locked and I/O failures all land in `Storage`, which callers treat
/// as transient.
pub(crate) fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::AlreadyExists(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_check_violation() || db.is_foreign_key_violation() => {
            RepositoryError::Constraint(db.message().to_string())
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound(e.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RepositoryError::Serialization(e.to_string())
        }
        _ => RepositoryError::Storage(e.to_string()),
    }
}
