//! Tool server descriptors.
//!
//! A descriptor is the catalog entry for one tool server: its identity,
//! presentation metadata and the command used to launch it. Descriptors
//! never carry secret material.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Catalog grouping for a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerCategory {
    /// Shipped with the gateway and needs no configuration.
    Builtin,
    /// Hosted by the gateway process itself.
    Gateway,
    /// Needs credentials before it can run.
    AuthRequired,
    /// Added by the user at runtime.
    Custom,
}

impl ServerCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Gateway => "gateway",
            Self::AuthRequired => "auth-required",
            Self::Custom => "custom",
        }
    }

    /// Parse a category from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "builtin" => Some(Self::Builtin),
            "gateway" => Some(Self::Gateway),
            "auth-required" => Some(Self::AuthRequired),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for ServerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the gateway starts a server process.
///
/// Arguments may contain `${KEY}` placeholders which are substituted with
/// the server's credential values at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl LaunchSpec {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.command.trim().is_empty() {
            return Err("Launch command cannot be empty".to_string());
        }
        if self.command.chars().any(char::is_whitespace) {
            return Err(format!(
                "Launch command '{}' must be a single executable; pass flags via args",
                self.command
            ));
        }
        Ok(())
    }

    /// Arguments with every `${KEY}` placeholder found in `values` replaced.
    ///
    /// Unknown placeholders are left untouched.
    pub fn expand_args(&self, values: &BTreeMap<String, String>) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| expand_placeholders(arg, values))
            .collect()
    }
}

fn expand_placeholders(input: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                if let Some(value) = values.get(key) {
                    out.push_str(value);
                } else {
                    out.push_str(&rest[start..start + 2 + end + 1]);
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// A catalog entry for one tool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Unique, stable identifier (`[a-z0-9_-]+`).
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ServerCategory,
    /// Built-in servers are never removable.
    pub builtin: bool,
    pub recommended: bool,
    /// Whether the server needs stored credentials before it may be enabled.
    pub requires_credentials: bool,
    pub launch: LaunchSpec,
}

impl ServerDescriptor {
    /// A user-defined server with no credentials and no recommendation.
    pub fn new(id: impl Into<String>, name: impl Into<String>, launch: LaunchSpec) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: ServerCategory::Custom,
            builtin: false,
            recommended: false,
            requires_credentials: false,
            launch,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub const fn with_category(mut self, category: ServerCategory) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub const fn with_recommended(mut self, recommended: bool) -> Self {
        self.recommended = recommended;
        self
    }

    #[must_use]
    pub const fn with_credentials(mut self, requires_credentials: bool) -> Self {
        self.requires_credentials = requires_credentials;
        self
    }

    #[must_use]
    pub const fn as_builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Server id cannot be empty".to_string());
        }
        if !self
            .id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(format!(
                "Server id '{}' may only contain lowercase letters, digits, '-' and '_'",
                self.id
            ));
        }
        if self.name.trim().is_empty() {
            return Err("Server name cannot be empty".to_string());
        }
        self.launch.validate()
    }
}
