//! Connectivity probe port.
//!
//! A probe performs a lightweight handshake against the service behind a
//! tool server (for example an authenticated "who am I" call) to check that
//! a credential set actually works. The core treats the result as an opaque
//! success flag plus a message.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::SecretValue;

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub success: bool,
    pub message: String,
    /// Non-secret facts reported by the service (account name, team, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ProbeOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Outcome for servers that have no probe.
    pub fn skipped(server_id: &str) -> Self {
        Self::ok(format!("No connectivity check available for {server_id}"))
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// The full credential set handed to a probe.
///
/// Values are only reachable through [`ProbeCredentials::get`]; the type's
/// `Debug` output is redacted.
#[derive(Debug, Clone, Default)]
pub struct ProbeCredentials {
    values: BTreeMap<String, SecretValue>,
}

impl ProbeCredentials {
    pub fn new(values: BTreeMap<String, SecretValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(SecretValue::expose)
            .filter(|v| !v.is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Checks credentials against the backing service of a server.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Never fails: transport errors are reported as unsuccessful outcomes.
    async fn probe(&self, server_id: &str, credentials: &ProbeCredentials) -> ProbeOutcome;
}

/// Probe that reports every server as skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProbe;

#[async_trait]
impl ConnectivityProbe for NoopProbe {
    async fn probe(&self, server_id: &str, _credentials: &ProbeCredentials) -> ProbeOutcome {
        ProbeOutcome::skipped(server_id)
    }
}
