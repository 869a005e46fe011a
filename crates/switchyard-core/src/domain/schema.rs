//! Credential schemas.
//!
//! A schema declares which configuration fields a server accepts, which of
//! them are required and what format each value must have. Schemas are
//! static data: they are built once at startup and never change while the
//! process runs.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a server's configuration is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigShape {
    /// Exactly one field.
    Single,
    /// Two or more fields.
    Multiple,
    /// Exactly one opaque multi-line field holding a connection string.
    ConnectionString,
}

/// How a field is presented for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    Text,
    Secret,
    MultiLine,
    Url,
}

/// One field of a credential schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFieldSpec {
    pub key: String,
    pub label: String,
    pub input_kind: InputKind,
    pub required: bool,
    /// Regex the whole value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl ConfigFieldSpec {
    /// A required field with no format constraint.
    pub fn new(key: impl Into<String>, label: impl Into<String>, input_kind: InputKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            input_kind,
            required: true,
            pattern: None,
            placeholder: None,
            help_text: None,
        }
    }

    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help_text = Some(help.into());
        self
    }

    /// Compile the field's pattern anchored to the whole value.
    pub fn compile_pattern(&self) -> Result<Option<Regex>, regex::Error> {
        self.pattern
            .as_deref()
            .map(|p| Regex::new(&format!("^(?:{p})$")))
            .transpose()
    }
}

/// The credential schema of one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfigSchema {
    pub server_id: String,
    pub shape: ConfigShape,
    /// Fields in declaration order.
    pub fields: Vec<ConfigFieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

impl ServerConfigSchema {
    pub fn new(server_id: impl Into<String>, shape: ConfigShape, fields: Vec<ConfigFieldSpec>) -> Self {
        Self {
            server_id: server_id.into(),
            shape,
            fields,
            documentation_url: None,
        }
    }

    #[must_use]
    pub fn with_documentation(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&ConfigFieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Keys of required fields, in declaration order.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.key.as_str())
    }

    /// Check the structural invariants of the schema.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.server_id.trim().is_empty() {
            return Err(SchemaError::EmptyServerId);
        }

        let shape_ok = match self.shape {
            ConfigShape::Single | ConfigShape::ConnectionString => self.fields.len() == 1,
            ConfigShape::Multiple => self.fields.len() >= 2,
        };
        if !shape_ok {
            return Err(SchemaError::ShapeMismatch {
                server_id: self.server_id.clone(),
                shape: self.shape,
                fields: self.fields.len(),
            });
        }

        if self.shape == ConfigShape::ConnectionString
            && self.fields.iter().any(|f| f.input_kind != InputKind::MultiLine)
        {
            return Err(SchemaError::ConnectionStringKind {
                server_id: self.server_id.clone(),
            });
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.key.as_str()) {
                return Err(SchemaError::DuplicateKey {
                    server_id: self.server_id.clone(),
                    key: field.key.clone(),
                });
            }
            field
                .compile_pattern()
                .map_err(|e| SchemaError::InvalidPattern {
                    server_id: self.server_id.clone(),
                    key: field.key.clone(),
                    reason: e.to_string(),
                })?;
        }

        Ok(())
    }
}

/// A schema that violates its structural invariants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Schema server id cannot be empty")]
    EmptyServerId,

    #[error("Schema for '{server_id}' has shape {shape:?} but {fields} field(s)")]
    ShapeMismatch {
        server_id: String,
        shape: ConfigShape,
        fields: usize,
    },

    #[error("Connection-string schema for '{server_id}' must use a multi-line field")]
    ConnectionStringKind { server_id: String },

    #[error("Schema for '{server_id}' declares key '{key}' more than once")]
    DuplicateKey { server_id: String, key: String },

    #[error("Invalid pattern for '{server_id}.{key}': {reason}")]
    InvalidPattern {
        server_id: String,
        key: String,
        reason: String,
    },

    #[error("More than one schema registered for '{0}'")]
    DuplicateSchema(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_key() -> ConfigFieldSpec {
        ConfigFieldSpec::new("API_KEY", "API Key", InputKind::Secret)
    }

    #[test]
    fn single_shape_requires_exactly_one_field() {
        let schema = ServerConfigSchema::new("x", ConfigShape::Single, vec![api_key(), api_key()]);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::ShapeMismatch { fields: 2, .. })
        ));
    }

    #[test]
    fn multiple_shape_rejects_duplicate_keys() {
        let schema = ServerConfigSchema::new("x", ConfigShape::Multiple, vec![api_key(), api_key()]);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn connection_string_needs_multiline_field() {
        let schema = ServerConfigSchema::new("db", ConfigShape::ConnectionString, vec![api_key()]);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::ConnectionStringKind { .. })
        ));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let schema = ServerConfigSchema::new(
            "x",
            ConfigShape::Single,
            vec![api_key().with_pattern("(unclosed")],
        );
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn compiled_pattern_is_anchored() {
        let field = api_key().with_pattern("tvly-[a-z]+");
        let re = field.compile_pattern().unwrap().unwrap();
        assert!(re.is_match("tvly-abc"));
        assert!(!re.is_match("xx tvly-abc"));
        assert!(!re.is_match("tvly-abc!"));
    }

    #[test]
    fn required_keys_preserve_declaration_order() {
        let schema = ServerConfigSchema::new(
            "sentry",
            ConfigShape::Multiple,
            vec![
                ConfigFieldSpec::new("B", "B", InputKind::Text),
                ConfigFieldSpec::new("C", "C", InputKind::Text).optional(),
                ConfigFieldSpec::new("A", "A", InputKind::Text),
            ],
        );
        assert_eq!(schema.required_keys().collect::<Vec<_>>(), vec!["B", "A"]);
    }
}
