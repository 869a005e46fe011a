//! Client configuration documents.
//!
//! Rendering projects every active server to a command, an argument list
//! and an environment map of decrypted credentials, then lays those out in
//! the shape a particular client expects. The output is deterministic:
//! servers and env keys are ordered by id and key.
//!
//! Rendered documents contain plaintext credentials. Only trusted callers
//! should hold a [`ConfigRenderer`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value, json};
use thiserror::Error;

use super::schema_registry::SchemaRegistry;
use super::secret_store::{SecretStore, SecretStoreError};
use crate::domain::EffectiveServerView;

const DOTTED_PREFIX: &str = "mcp.servers.";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot read credentials for '{server_id}': {source}")]
    SecretUnavailable {
        server_id: String,
        #[source]
        source: SecretStoreError,
    },

    #[error("Failed to serialize config document: {0}")]
    Serialization(String),

    #[error("Unknown render target '{0}' (expected one of: mcp-servers, zed, server-list, dotted)")]
    UnknownTarget(String),
}

/// The document layouts switchyard can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientTarget {
    /// `{"mcpServers": {id: {command, args, env}}}`
    McpServers,
    /// `{"context_servers": {id: {command: {path, args, env}}}}`
    Zed,
    /// `{"servers": [{name, command, args, env}]}`
    ServerList,
    /// Flat `mcp.servers.<id>.command` style keys.
    Dotted,
}

impl ClientTarget {
    pub const ALL: [Self; 4] = [Self::McpServers, Self::Zed, Self::ServerList, Self::Dotted];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::McpServers => "mcp-servers",
            Self::Zed => "zed",
            Self::ServerList => "server-list",
            Self::Dotted => "dotted",
        }
    }
}

impl fmt::Display for ClientTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientTarget {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RenderError::UnknownTarget(s.to_string()))
    }
}

/// One server ready to be laid out.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedServer {
    pub id: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl fmt::Debug for RenderedServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedServer")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("args", &self.args.len())
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A rendered client configuration.
#[derive(Clone, PartialEq)]
pub struct ConfigDocument {
    target: ClientTarget,
    value: Value,
}

impl fmt::Debug for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigDocument")
            .field("target", &self.target)
            .field("servers", &self.server_ids())
            .finish_non_exhaustive()
    }
}

impl ConfigDocument {
    pub const fn target(&self) -> ClientTarget {
        self.target
    }

    pub const fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn to_pretty_string(&self) -> Result<String, RenderError> {
        serde_json::to_string_pretty(&self.value)
            .map_err(|e| RenderError::Serialization(e.to_string()))
    }

    /// Ids of the servers in the document, sorted.
    pub fn server_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = match self.target {
            ClientTarget::McpServers => object_keys(&self.value["mcpServers"]),
            ClientTarget::Zed => object_keys(&self.value["context_servers"]),
            ClientTarget::ServerList => self.value["servers"]
                .as_array()
                .map(|servers| {
                    servers
                        .iter()
                        .filter_map(|s| s["name"].as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            ClientTarget::Dotted => self
                .value
                .as_object()
                .map(|map| {
                    map.keys()
                        .filter_map(|k| k.strip_prefix(DOTTED_PREFIX))
                        .filter_map(|rest| rest.strip_suffix(".command"))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };
        ids.sort();
        ids.dedup();
        ids
    }

    /// Decode the environment map of one server back out of the document.
    pub fn env_of(&self, server_id: &str) -> Option<BTreeMap<String, String>> {
        let env = match self.target {
            ClientTarget::McpServers => self.value["mcpServers"].get(server_id)?.get("env")?,
            ClientTarget::Zed => self.value["context_servers"]
                .get(server_id)?
                .get("command")?
                .get("env")?,
            ClientTarget::ServerList => self.value["servers"]
                .as_array()?
                .iter()
                .find(|s| s["name"] == server_id)?
                .get("env")?,
            ClientTarget::Dotted => {
                let map = self.value.as_object()?;
                map.get(&format!("{DOTTED_PREFIX}{server_id}.command"))?;
                let prefix = format!("{DOTTED_PREFIX}{server_id}.env.");
                return Some(
                    map.iter()
                        .filter_map(|(k, v)| {
                            Some((k.strip_prefix(&prefix)?.to_string(), v.as_str()?.to_string()))
                        })
                        .collect(),
                );
            }
        };
        Some(
            env.as_object()?
                .iter()
                .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                .collect(),
        )
    }
}

fn object_keys(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}

fn env_value(env: &BTreeMap<String, String>) -> Value {
    Value::Object(
        env.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Lay out already-resolved servers for a target. Pure.
pub fn render_document(target: ClientTarget, servers: &[RenderedServer]) -> ConfigDocument {
    let mut sorted: Vec<&RenderedServer> = servers.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let value = match target {
        ClientTarget::McpServers => {
            let entries: Map<String, Value> = sorted
                .iter()
                .map(|s| {
                    (
                        s.id.clone(),
                        json!({ "command": s.command, "args": s.args, "env": env_value(&s.env) }),
                    )
                })
                .collect();
            json!({ "mcpServers": entries })
        }
        ClientTarget::Zed => {
            let entries: Map<String, Value> = sorted
                .iter()
                .map(|s| {
                    (
                        s.id.clone(),
                        json!({
                            "command": {
                                "path": s.command,
                                "args": s.args,
                                "env": env_value(&s.env),
                            }
                        }),
                    )
                })
                .collect();
            json!({ "context_servers": entries })
        }
        ClientTarget::ServerList => {
            let entries: Vec<Value> = sorted
                .iter()
                .map(|s| {
                    json!({
                        "name": s.id,
                        "command": s.command,
                        "args": s.args,
                        "env": env_value(&s.env),
                    })
                })
                .collect();
            json!({ "servers": entries })
        }
        ClientTarget::Dotted => {
            let mut map = Map::new();
            for s in &sorted {
                let base = format!("{DOTTED_PREFIX}{}", s.id);
                map.insert(format!("{base}.command"), json!(s.command));
                map.insert(format!("{base}.args"), json!(s.args));
                for (k, v) in &s.env {
                    map.insert(format!("{base}.env.{k}"), json!(v));
                }
            }
            Value::Object(map)
        }
    };

    ConfigDocument { target, value }
}

/// Resolves credentials for active servers and renders documents.
#[derive(Clone)]
pub struct ConfigRenderer {
    schemas: Arc<SchemaRegistry>,
    secrets: SecretStore,
}

impl ConfigRenderer {
    pub const fn new(schemas: Arc<SchemaRegistry>, secrets: SecretStore) -> Self {
        Self { schemas, secrets }
    }

    /// Render the active servers among `views`.
    pub async fn render(
        &self,
        target: ClientTarget,
        views: &[EffectiveServerView],
    ) -> Result<ConfigDocument, RenderError> {
        let mut servers = Vec::new();
        for view in views.iter().filter(|v| v.is_active()) {
            servers.push(self.resolve(view).await?);
        }
        let document = render_document(target, &servers);
        tracing::debug!(client = %target, servers = servers.len(), "Rendered config document");
        Ok(document)
    }

    async fn resolve(&self, view: &EffectiveServerView) -> Result<RenderedServer, RenderError> {
        let id = view.id();
        let keys = self
            .schemas
            .fields_of(id)
            .iter()
            .map(|f| f.key.as_str());
        let env: BTreeMap<String, String> = self
            .secrets
            .get_many(id, keys)
            .await
            .map_err(|source| RenderError::SecretUnavailable {
                server_id: id.to_string(),
                source,
            })?
            .into_iter()
            .map(|(k, v)| (k, v.into_inner()))
            .collect();

        let launch = &view.descriptor.launch;
        Ok(RenderedServer {
            id: id.to_string(),
            command: launch.command.clone(),
            args: launch.expand_args(&env),
            env,
        })
    }
}
