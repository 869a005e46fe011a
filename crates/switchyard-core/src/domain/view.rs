//! The effective, derived state of a server.
//!
//! Nothing in this module is persisted. A view is recomputed from the
//! descriptor, the schema, the set of stored credential keys and the toggle
//! state every time it is requested.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::schema::ServerConfigSchema;
use super::server::ServerDescriptor;
use super::state::ServerToggleState;

/// Whether a server has the credentials it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Readiness {
    Ready,
    /// None of the required credentials are stored.
    NeedsCredentials,
    /// Some, but not all, required credentials are stored.
    Blocked,
}

impl Readiness {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::NeedsCredentials => "needsCredentials",
            Self::Blocked => "blocked",
        }
    }
}

/// Runtime status as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Active,
    Inactive,
    /// Enabled but missing required credentials. Only reachable through
    /// state that predates the gating rule or through concurrent deletes.
    Error,
}

impl ServerStatus {
    pub const fn from_parts(enabled: bool, readiness: Readiness) -> Self {
        match (enabled, readiness.is_ready()) {
            (true, true) => Self::Active,
            (true, false) => Self::Error,
            (false, _) => Self::Inactive,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Error => "error",
        }
    }
}

/// Compute readiness and the missing required keys.
///
/// A server that does not require credentials, or that has no schema, is
/// always ready.
pub fn compute_readiness(
    descriptor: &ServerDescriptor,
    schema: Option<&ServerConfigSchema>,
    stored_keys: &BTreeSet<String>,
) -> (Readiness, Vec<String>) {
    let Some(schema) = schema.filter(|_| descriptor.requires_credentials) else {
        return (Readiness::Ready, Vec::new());
    };

    let required: Vec<&str> = schema.required_keys().collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|key| !stored_keys.contains(**key))
        .map(|key| (*key).to_string())
        .collect();

    let readiness = if missing.is_empty() {
        Readiness::Ready
    } else if missing.len() == required.len() {
        Readiness::NeedsCredentials
    } else {
        Readiness::Blocked
    };
    (readiness, missing)
}

/// A server as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveServerView {
    #[serde(flatten)]
    pub descriptor: ServerDescriptor,
    pub enabled: bool,
    /// True when `enabled` comes from a stored toggle rather than the default.
    pub explicit: bool,
    pub readiness: Readiness,
    pub status: ServerStatus,
    /// Stored credential keys; schema fields first in declaration order.
    pub configured_keys: Vec<String>,
    pub missing_keys: Vec<String>,
}

impl EffectiveServerView {
    pub fn compute(
        descriptor: ServerDescriptor,
        schema: Option<&ServerConfigSchema>,
        stored_keys: &BTreeSet<String>,
        toggle: Option<&ServerToggleState>,
    ) -> Self {
        let (readiness, missing_keys) = compute_readiness(&descriptor, schema, stored_keys);
        let enabled = toggle.map_or(descriptor.recommended, |t| t.enabled);
        let status = ServerStatus::from_parts(enabled, readiness);

        let mut configured_keys: Vec<String> = schema
            .map(|s| {
                s.fields
                    .iter()
                    .filter(|f| stored_keys.contains(&f.key))
                    .map(|f| f.key.clone())
                    .collect()
            })
            .unwrap_or_default();
        for key in stored_keys {
            if !configured_keys.contains(key) {
                configured_keys.push(key.clone());
            }
        }

        Self {
            descriptor,
            enabled,
            explicit: toggle.is_some(),
            readiness,
            status,
            configured_keys,
            missing_keys,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub const fn is_active(&self) -> bool {
        matches!(self.status, ServerStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{ConfigFieldSpec, ConfigShape, InputKind};
    use crate::domain::server::LaunchSpec;

    fn sentry() -> (ServerDescriptor, ServerConfigSchema) {
        let descriptor = ServerDescriptor::new("sentry", "Sentry", LaunchSpec::new("npx", ["x"]))
            .with_credentials(true);
        let schema = ServerConfigSchema::new(
            "sentry",
            ConfigShape::Multiple,
            vec![
                ConfigFieldSpec::new("SENTRY_AUTH_TOKEN", "Token", InputKind::Secret),
                ConfigFieldSpec::new("SENTRY_ORG", "Org", InputKind::Text),
                ConfigFieldSpec::new("SENTRY_URL", "URL", InputKind::Url).optional(),
            ],
        );
        (descriptor, schema)
    }

    fn keys(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|k| (*k).to_string()).collect()
    }

    #[test]
    fn readiness_distinguishes_none_some_and_all() {
        let (d, s) = sentry();
        assert_eq!(
            compute_readiness(&d, Some(&s), &keys(&[])).0,
            Readiness::NeedsCredentials
        );
        assert_eq!(
            compute_readiness(&d, Some(&s), &keys(&["SENTRY_ORG", "SENTRY_URL"])),
            (Readiness::Blocked, vec!["SENTRY_AUTH_TOKEN".to_string()])
        );
        assert_eq!(
            compute_readiness(&d, Some(&s), &keys(&["SENTRY_AUTH_TOKEN", "SENTRY_ORG"])).0,
            Readiness::Ready
        );
    }

    #[test]
    fn servers_without_credentials_are_always_ready() {
        let (d, s) = sentry();
        let d = d.with_credentials(false);
        assert_eq!(compute_readiness(&d, Some(&s), &keys(&[])).0, Readiness::Ready);
    }

    #[test]
    fn default_enablement_follows_recommended() {
        let (d, s) = sentry();
        let stored = keys(&["SENTRY_AUTH_TOKEN", "SENTRY_ORG"]);

        let view = EffectiveServerView::compute(d.clone(), Some(&s), &stored, None);
        assert!(!view.enabled);
        assert!(!view.explicit);
        assert_eq!(view.status, ServerStatus::Inactive);

        let view = EffectiveServerView::compute(d.with_recommended(true), Some(&s), &stored, None);
        assert!(view.enabled);
        assert_eq!(view.status, ServerStatus::Active);
    }

    #[test]
    fn explicit_toggle_overrides_default() {
        let (d, s) = sentry();
        let toggle = ServerToggleState::new("sentry", true);
        let view = EffectiveServerView::compute(d, Some(&s), &keys(&[]), Some(&toggle));
        assert!(view.enabled && view.explicit);
        assert_eq!(view.status, ServerStatus::Error);
        assert_eq!(view.missing_keys, vec!["SENTRY_AUTH_TOKEN", "SENTRY_ORG"]);
    }

    #[test]
    fn configured_keys_follow_schema_order_then_extras() {
        let (d, s) = sentry();
        let stored = keys(&["LEGACY", "SENTRY_ORG", "SENTRY_AUTH_TOKEN"]);
        let view = EffectiveServerView::compute(d, Some(&s), &stored, None);
        assert_eq!(
            view.configured_keys,
            vec!["SENTRY_AUTH_TOKEN", "SENTRY_ORG", "LEGACY"]
        );
    }
}
