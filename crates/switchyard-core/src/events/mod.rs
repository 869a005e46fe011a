//! Canonical event union for state changes.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "server_toggled", "serverId": "github", "enabled": true, "status": "active" }
//! ```
//!
//! Events carry identifiers and flags only. They never contain secret values.

use serde::{Deserialize, Serialize};

use crate::domain::ServerStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A custom server was added to the registry.
    ServerAdded {
        #[serde(rename = "serverId")]
        server_id: String,
        name: String,
    },

    /// A custom server and everything attached to it was removed.
    ServerRemoved {
        #[serde(rename = "serverId")]
        server_id: String,
        #[serde(rename = "secretsDeleted")]
        secrets_deleted: u64,
    },

    /// An explicit toggle was written or cleared.
    ServerToggled {
        #[serde(rename = "serverId")]
        server_id: String,
        enabled: bool,
        status: ServerStatus,
    },

    /// Credential values were stored for a server.
    CredentialsSaved {
        #[serde(rename = "serverId")]
        server_id: String,
        keys: Vec<String>,
    },

    /// A gateway reload attempt finished.
    ReloadFinished { success: bool, message: String },
}

impl AppEvent {
    /// The server this event concerns, if any.
    pub fn server_id(&self) -> Option<&str> {
        match self {
            Self::ServerAdded { server_id, .. }
            | Self::ServerRemoved { server_id, .. }
            | Self::ServerToggled { server_id, .. }
            | Self::CredentialsSaved { server_id, .. } => Some(server_id),
            Self::ReloadFinished { .. } => None,
        }
    }
}
