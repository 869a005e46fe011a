//! Secret records and the values they protect.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Fixed mask shown in place of any secret value.
pub const SECRET_MASK: &str = "••••••••";

/// A decrypted credential value.
///
/// `Debug` and `Display` never print the value. Callers reach the plaintext
/// only through [`SecretValue::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue({SECRET_MASK})")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SECRET_MASK)
    }
}

/// A stored, encrypted credential.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub server_id: String,
    pub key: String,
    pub encrypted_value: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("server_id", &self.server_id)
            .field("key", &self.key)
            .field("encrypted_len", &self.encrypted_value.len())
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// What may be shown about a secret: never any character of its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretMetadata {
    pub server_id: String,
    pub key: String,
    pub masked_value: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecretMetadata {
    pub fn new(
        server_id: impl Into<String>,
        key: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            key: key.into(),
            masked_value: SECRET_MASK,
            created_at,
            updated_at,
        }
    }
}

impl From<&SecretRecord> for SecretMetadata {
    fn from(record: &SecretRecord) -> Self {
        Self::new(
            record.server_id.clone(),
            record.key.clone(),
            record.created_at,
            record.updated_at,
        )
    }
}
