//! Explicit enable/disable choices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted user choice for one server.
///
/// At most one exists per server. Its absence means the server falls back
/// to its `recommended` default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerToggleState {
    pub server_id: String,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl ServerToggleState {
    pub fn new(server_id: impl Into<String>, enabled: bool) -> Self {
        Self {
            server_id: server_id.into(),
            enabled,
            updated_at: Utc::now(),
        }
    }
}
