//! End-to-end behaviour of the reconciliation engine over in-memory ports.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use switchyard_core::ports::{RepositoryError, Repos, ToggleStateRepository};
use switchyard_core::services::{ProbeMode, SubmitOptions};
use switchyard_core::testing::{InMemoryStore, PlaintextCipher, RecordingEmitter, StaticProbe};
use switchyard_core::{
    ActivationError, AppEvent, ClientTarget, ConfigFieldSpec, ConfigShape, ErrorCategory,
    GatewayCore, GatewayDeps, InputKind, LaunchSpec, Readiness, SchemaRegistry,
    ServerConfigSchema, ServerDescriptor, ServerStatus, ServerToggleState, ToggleError,
};

struct Harness {
    core: GatewayCore,
    mem: Arc<InMemoryStore>,
    probe: StaticProbe,
    events: RecordingEmitter,
}

fn schemas() -> SchemaRegistry {
    SchemaRegistry::from_schemas(vec![
        ServerConfigSchema::new(
            "alpha",
            ConfigShape::Multiple,
            vec![
                ConfigFieldSpec::new("K1", "First key", InputKind::Secret),
                ConfigFieldSpec::new("K2", "Second key", InputKind::Secret),
            ],
        ),
        ServerConfigSchema::new(
            "beta",
            ConfigShape::Single,
            vec![ConfigFieldSpec::new("TOKEN", "Token", InputKind::Secret).with_pattern("tok_[a-z]+")],
        ),
        ServerConfigSchema::new(
            "pg",
            ConfigShape::ConnectionString,
            vec![
                ConfigFieldSpec::new("DSN", "Connection String", InputKind::MultiLine)
                    .with_pattern("postgresql://.+"),
            ],
        ),
    ])
    .unwrap()
}

async fn harness_with(probe: StaticProbe) -> Harness {
    let mem = Arc::new(InMemoryStore::new());
    let events = RecordingEmitter::new();
    let deps = GatewayDeps::new(Arc::new(PlaintextCipher), Arc::new(schemas()))
        .with_probe(Arc::new(probe.clone()))
        .with_emitter(Arc::new(events.clone()))
        .with_timeouts(Duration::from_millis(100), Duration::from_secs(1));
    let core = GatewayCore::new(mem.repos(), deps);

    let catalog = vec![
        ServerDescriptor::new("time", "Time", LaunchSpec::new("docker", ["run", "mcp/time"]))
            .with_recommended(true)
            .as_builtin(),
        ServerDescriptor::new("alpha", "Alpha", LaunchSpec::new("npx", ["-y", "alpha"]))
            .with_credentials(true),
        ServerDescriptor::new("beta", "Beta", LaunchSpec::new("npx", ["-y", "beta"]))
            .with_credentials(true),
        ServerDescriptor::new(
            "pg",
            "Postgres",
            LaunchSpec::new("npx", ["-y", "pg-server", "--dsn", "${DSN}"]),
        )
        .with_credentials(true),
        ServerDescriptor::new("lonely", "Lonely", LaunchSpec::new("lonely", ["serve"])),
    ];
    core.registry().seed_catalog(&catalog).await.unwrap();

    Harness {
        core,
        mem,
        probe,
        events,
    }
}

async fn harness() -> Harness {
    harness_with(StaticProbe::passing()).await
}

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[tokio::test]
async fn servers_without_schema_accept_only_empty_payloads() {
    let h = harness().await;

    let err = h
        .core
        .activation()
        .submit("lonely", &values(&[("X", "y")]), SubmitOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ActivationError::SchemaNotApplicable { .. }));

    let outcome = h
        .core
        .activation()
        .submit("lonely", &values(&[]), SubmitOptions::default())
        .await
        .unwrap();
    assert!(outcome.stored_keys.is_empty());
    assert_eq!(h.mem.secret_writes(), 0);
}

#[tokio::test]
async fn alpha_scenario_reports_second_missing_key_then_succeeds() {
    let h = harness().await;
    let pipeline = h.core.activation();

    let err = pipeline
        .submit("alpha", &values(&[("K1", "v1")]), SubmitOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ActivationError::MissingRequiredField(ref k) if k == "K2"));
    assert_eq!(err.category(), ErrorCategory::UserInput);
    assert_eq!(h.mem.secret_writes(), 0);

    let outcome = pipeline
        .submit(
            "alpha",
            &values(&[("K1", "v1"), ("K2", "v2")]),
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.stored_keys, vec!["K1", "K2"]);

    let keys: Vec<String> = h
        .core
        .inspector()
        .list_keys("alpha")
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(keys, vec!["K1", "K2"]);
    let view = h.core.reconciler().view("alpha").await.unwrap();
    assert_eq!(view.readiness, Readiness::Ready);
}

#[tokio::test]
async fn set_enabled_twice_writes_once() {
    let h = harness().await;
    let reconciler = h.core.reconciler();

    let first = reconciler.set_enabled("lonely", true).await.unwrap();
    let second = reconciler.set_enabled("lonely", true).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.mem.toggle_writes(), 1);
}

#[tokio::test]
async fn explicit_toggle_beats_recommended_default() {
    let h = harness().await;
    let before = h.core.reconciler().view("lonely").await.unwrap();
    assert!(!before.descriptor.recommended);
    assert!(!before.enabled);

    h.core.reconciler().set_enabled("lonely", true).await.unwrap();
    let after = h.core.reconciler().view("lonely").await.unwrap();
    assert!(after.enabled);
    assert!(after.explicit);

    h.core.reconciler().set_enabled("time", false).await.unwrap();
    let time = h.core.reconciler().view("time").await.unwrap();
    assert!(!time.enabled);
    assert_eq!(time.status, ServerStatus::Inactive);
}

#[tokio::test]
async fn gating_blocks_until_every_required_key_is_stored() {
    let h = harness().await;
    h.core.secrets().put("alpha", "K1", "v1").await.unwrap();

    let err = h.core.reconciler().set_enabled("alpha", true).await.unwrap_err();
    assert!(matches!(
        err,
        ToggleError::Gated {
            readiness: Readiness::Blocked,
            ..
        }
    ));

    h.core
        .activation()
        .submit(
            "alpha",
            &values(&[("K1", "v1"), ("K2", "v2")]),
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    let view = h.core.reconciler().set_enabled("alpha", true).await.unwrap();
    assert_eq!(view.status, ServerStatus::Active);
}

#[tokio::test]
async fn beta_with_no_credentials_is_gated_without_a_toggle_row() {
    let h = harness().await;
    let err = h.core.reconciler().set_enabled("beta", true).await.unwrap_err();
    assert!(matches!(
        err,
        ToggleError::Gated {
            readiness: Readiness::NeedsCredentials,
            ..
        }
    ));
    assert_eq!(h.mem.toggle_writes(), 0);
    let view = h.core.reconciler().view("beta").await.unwrap();
    assert!(!view.explicit);
}

#[tokio::test]
async fn rendered_env_equals_stored_credentials_exactly() {
    let h = harness().await;
    h.core
        .activation()
        .submit(
            "alpha",
            &values(&[("K1", "x"), ("K2", "y")]),
            SubmitOptions {
                auto_enable: true,
                ..SubmitOptions::default()
            },
        )
        .await
        .unwrap();

    for target in ClientTarget::ALL {
        let doc = h.core.render_current(target).await.unwrap();
        let env = doc.env_of("alpha").unwrap();
        assert_eq!(env, values(&[("K1", "x"), ("K2", "y")]), "{target}");
    }
}

#[tokio::test]
async fn render_includes_only_active_servers_and_expands_placeholders() {
    let h = harness().await;
    h.core
        .activation()
        .submit(
            "pg",
            &values(&[("DSN", "postgresql://u:p@db/app")]),
            SubmitOptions {
                auto_enable: true,
                ..SubmitOptions::default()
            },
        )
        .await
        .unwrap();
    // Stored but never enabled.
    h.core
        .activation()
        .submit("beta", &values(&[("TOKEN", "tok_abc")]), SubmitOptions::default())
        .await
        .unwrap();

    let doc = h.core.render_current(ClientTarget::McpServers).await.unwrap();
    assert_eq!(doc.server_ids(), vec!["pg", "time"]);
    let args = &doc.as_value()["mcpServers"]["pg"]["args"];
    assert_eq!(args[3], "postgresql://u:p@db/app");
}

#[tokio::test]
async fn probe_failure_keeps_secrets_but_skips_auto_enable() {
    let h = harness_with(StaticProbe::failing("401 Unauthorized")).await;
    let err = h
        .core
        .activation()
        .submit(
            "beta",
            &values(&[("TOKEN", "tok_abc")]),
            SubmitOptions {
                probe: ProbeMode::AfterPersist,
                auto_enable: true,
            },
        )
        .await
        .unwrap_err();

    match err {
        ActivationError::ProbeFailed {
            reason,
            stored_keys,
        } => {
            assert!(reason.contains("401"));
            assert_eq!(stored_keys, vec!["TOKEN"]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(h.core.inspector().exists("beta", "TOKEN").await.unwrap());
    assert!(!h.core.reconciler().view("beta").await.unwrap().enabled);
}

#[tokio::test]
async fn probe_before_persist_stores_nothing_on_failure() {
    let h = harness_with(StaticProbe::failing("bad token")).await;
    let err = h
        .core
        .activation()
        .submit(
            "beta",
            &values(&[("TOKEN", "tok_abc")]),
            SubmitOptions {
                probe: ProbeMode::BeforePersist,
                auto_enable: false,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Probe);
    assert_eq!(h.mem.secret_writes(), 0);
}

#[tokio::test]
async fn probe_sees_full_credential_set() {
    let h = harness().await;
    h.core
        .activation()
        .submit(
            "alpha",
            &values(&[("K1", "a"), ("K2", "b")]),
            SubmitOptions {
                probe: ProbeMode::AfterPersist,
                auto_enable: false,
            },
        )
        .await
        .unwrap();

    let calls = h.probe.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "alpha");
    assert_eq!(calls[0].1, values(&[("K1", "a"), ("K2", "b")]));
}

#[tokio::test]
async fn hanging_probe_times_out() {
    let h = harness_with(StaticProbe::hanging()).await;
    let err = h
        .core
        .activation()
        .submit(
            "beta",
            &values(&[("TOKEN", "tok_abc")]),
            SubmitOptions {
                probe: ProbeMode::AfterPersist,
                auto_enable: true,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActivationError::ProbeFailed { ref reason, .. } if reason.contains("timed out")));
}

#[tokio::test]
async fn storage_outage_reports_committed_fields() {
    let h = harness().await;
    h.mem.fail_secret_writes_after(1);

    let err = h
        .core
        .activation()
        .submit(
            "alpha",
            &values(&[("K1", "v1"), ("K2", "v2")]),
            SubmitOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    match err {
        ActivationError::StorageUnavailable { committed, .. } => {
            assert_eq!(committed, vec!["K1"]);
        }
        other => panic!("unexpected {other:?}"),
    }

    let keys = h.core.inspector().list_keys("alpha").await.unwrap();
    assert_eq!(keys.len(), 1);

    h.mem.heal();
    h.core
        .activation()
        .submit(
            "alpha",
            &values(&[("K1", "v1"), ("K2", "v2")]),
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(h.core.inspector().list_keys("alpha").await.unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_enables_for_one_server_write_once() {
    let h = Arc::new(harness().await);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.core.reconciler().set_enabled("lonely", true).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().enabled);
    }
    assert_eq!(h.mem.toggle_writes(), 1);
}

#[tokio::test]
async fn removing_a_custom_server_cascades() {
    let h = harness().await;
    let custom = ServerDescriptor::new("mine", "Mine", LaunchSpec::new("mine", ["run"]));
    h.core.registry().add(custom).await.unwrap();
    h.core.secrets().put("mine", "TOKEN", "x").await.unwrap();
    h.core.reconciler().set_enabled("mine", true).await.unwrap();

    let summary = h.core.registry().remove("mine").await.unwrap();
    assert_eq!(summary.secrets_deleted, 1);
    assert!(summary.toggle_deleted);
    assert!(h.core.registry().orphans().await.unwrap().is_empty());

    let events = h.events.events();
    assert!(events.iter().any(|e| matches!(e, AppEvent::ServerRemoved { server_id, .. } if server_id == "mine")));
}

#[tokio::test]
async fn events_never_carry_secret_values() {
    let h = harness().await;
    h.core
        .activation()
        .submit(
            "beta",
            &values(&[("TOKEN", "tok_verysecret")]),
            SubmitOptions {
                probe: ProbeMode::Skip,
                auto_enable: true,
            },
        )
        .await
        .unwrap();

    let events = h.events.events();
    assert!(events.len() >= 2);
    for event in events {
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("verysecret"), "{json}");
    }
}

/// Toggle repository that parks inside `upsert` until released.
struct GatedToggles {
    inner: Arc<InMemoryStore>,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl ToggleStateRepository for GatedToggles {
    async fn get(&self, server_id: &str) -> Result<Option<ServerToggleState>, RepositoryError> {
        ToggleStateRepository::get(&*self.inner, server_id).await
    }

    async fn list(&self) -> Result<Vec<ServerToggleState>, RepositoryError> {
        ToggleStateRepository::list(&*self.inner).await
    }

    async fn upsert(
        &self,
        server_id: &str,
        enabled: bool,
    ) -> Result<ServerToggleState, RepositoryError> {
        self.entered.notify_one();
        self.release.notified().await;
        ToggleStateRepository::upsert(&*self.inner, server_id, enabled).await
    }

    async fn delete(&self, server_id: &str) -> Result<bool, RepositoryError> {
        ToggleStateRepository::delete(&*self.inner, server_id).await
    }
}

#[tokio::test]
async fn credential_delete_waits_for_inflight_enable() {
    let mem = Arc::new(InMemoryStore::new());
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let toggles = Arc::new(GatedToggles {
        inner: Arc::clone(&mem),
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    });
    let repos = Repos::new(mem.clone(), mem.clone(), toggles);
    let deps = GatewayDeps::new(Arc::new(PlaintextCipher), Arc::new(schemas()));
    let core = Arc::new(GatewayCore::new(repos, deps));

    let alpha = ServerDescriptor::new("alpha", "Alpha", LaunchSpec::new("npx", ["-y", "alpha"]))
        .with_credentials(true);
    core.registry().seed_catalog(&[alpha]).await.unwrap();
    core.secrets().put("alpha", "K1", "one").await.unwrap();
    core.secrets().put("alpha", "K2", "two").await.unwrap();

    let enable = {
        let core = Arc::clone(&core);
        tokio::spawn(async move { core.reconciler().set_enabled("alpha", true).await })
    };
    entered.notified().await;

    let delete = {
        let core = Arc::clone(&core);
        tokio::spawn(async move { core.secrets().delete("alpha", "K1").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!delete.is_finished(), "delete ran inside the gating section");

    release.notify_one();
    let view = enable.await.unwrap().unwrap();
    assert_eq!(view.status, ServerStatus::Active);
    assert!(delete.await.unwrap().unwrap());

    // The delete is applied after the enable, so the state is visible as an error.
    let after = core.reconciler().view("alpha").await.unwrap();
    assert_eq!(after.readiness, Readiness::Blocked);
    assert_eq!(after.status, ServerStatus::Error);
}
