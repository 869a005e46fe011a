//! Read-only lookup of credential schemas.

use std::collections::HashMap;

use regex::Regex;

use crate::catalog;
use crate::domain::{ConfigFieldSpec, SchemaError, ServerConfigSchema};

/// Immutable schema table with pre-compiled field patterns.
///
/// A missing schema is not an error: such servers accept no credentials.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<ServerConfigSchema>,
    index: HashMap<String, usize>,
    patterns: HashMap<(String, String), Regex>,
}

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting invalid schemas and duplicate server ids.
    pub fn from_schemas(schemas: Vec<ServerConfigSchema>) -> Result<Self, SchemaError> {
        let mut index = HashMap::with_capacity(schemas.len());
        let mut patterns = HashMap::new();

        for (i, schema) in schemas.iter().enumerate() {
            schema.validate()?;
            if index.insert(schema.server_id.clone(), i).is_some() {
                return Err(SchemaError::DuplicateSchema(schema.server_id.clone()));
            }
            for field in &schema.fields {
                let compiled = field
                    .compile_pattern()
                    .map_err(|e| SchemaError::InvalidPattern {
                        server_id: schema.server_id.clone(),
                        key: field.key.clone(),
                        reason: e.to_string(),
                    })?;
                if let Some(re) = compiled {
                    patterns.insert((schema.server_id.clone(), field.key.clone()), re);
                }
            }
        }

        Ok(Self {
            schemas,
            index,
            patterns,
        })
    }

    /// The shipped schema catalog.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_schemas(catalog::builtin_schemas())
    }

    pub fn get_schema(&self, server_id: &str) -> Option<&ServerConfigSchema> {
        self.index.get(server_id).and_then(|&i| self.schemas.get(i))
    }

    /// Fields in declaration order; empty when the server has no schema.
    pub fn fields_of(&self, server_id: &str) -> &[ConfigFieldSpec] {
        self.get_schema(server_id)
            .map(|schema| schema.fields.as_slice())
            .unwrap_or_default()
    }

    /// Whether `value` satisfies the field's pattern. Fields without a
    /// pattern accept anything.
    pub fn matches_pattern(&self, server_id: &str, key: &str, value: &str) -> bool {
        self.patterns
            .get(&(server_id.to_string(), key.to_string()))
            .is_none_or(|re| re.is_match(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerConfigSchema> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
