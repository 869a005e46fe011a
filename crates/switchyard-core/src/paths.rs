//! Canonical on-disk locations.
//!
//! Resolution order for the data root:
//!
//! 1. `SWITCHYARD_DATA_DIR` environment variable
//! 2. `<system data dir>/switchyard`

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "SWITCHYARD_DATA_DIR";

/// Errors that can occur during path resolution and directory operations.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the system data directory.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },
}

/// The data root, honouring `SWITCHYARD_DATA_DIR`.
pub fn data_root() -> Result<PathBuf, PathError> {
    resolve_data_root(env::var(DATA_DIR_ENV).ok().as_deref())
}

/// Resolve the data root from an optional override.
pub fn resolve_data_root(override_dir: Option<&str>) -> Result<PathBuf, PathError> {
    if let Some(dir) = override_dir.filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    Ok(data_dir.join("switchyard"))
}

/// Path of the SQLite database under the default data root.
pub fn database_path() -> Result<PathBuf, PathError> {
    database_path_in(&data_root()?)
}

/// Path of the SQLite database under `root`, creating `root/data`.
pub fn database_path_in(root: &Path) -> Result<PathBuf, PathError> {
    let data_dir = root.join("data");

    fs::create_dir_all(&data_dir).map_err(|e| PathError::CreateFailed {
        path: data_dir.clone(),
        reason: e.to_string(),
    })?;

    Ok(data_dir.join("switchyard.db"))
}
