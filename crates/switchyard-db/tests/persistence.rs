//! Full-stack checks: core services over `SQLite` with the real cipher.

use std::collections::BTreeMap;
use std::sync::Arc;

use switchyard_core::catalog::builtin_servers;
use switchyard_core::services::SubmitOptions;
use switchyard_core::{ClientTarget, GatewayCore, GatewayDeps, SchemaRegistry, ServerStatus};
use switchyard_crypto::AesGcmCipher;
use switchyard_db::{CoreFactory, TestDb, setup_database};

const MASTER_KEY: &str = "integration-master-key";

fn deps() -> GatewayDeps {
    GatewayDeps::new(
        Arc::new(AesGcmCipher::from_master_key(MASTER_KEY).unwrap()),
        Arc::new(SchemaRegistry::builtin().unwrap()),
    )
}

async fn seeded(pool: sqlx::SqlitePool) -> GatewayCore {
    let core = CoreFactory::build_gateway_core(pool, deps());
    core.registry().seed_catalog(&builtin_servers()).await.unwrap();
    core
}

fn github_token() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
        format!("ghp_{}", "a".repeat(36)),
    )])
}

#[tokio::test]
async fn stored_values_are_ciphertext() {
    let db = TestDb::new().await.unwrap();
    let core = seeded(db.pool().clone()).await;

    core.activation()
        .submit("github", &github_token(), SubmitOptions::default())
        .await
        .unwrap();

    let raw: Vec<u8> = sqlx::query_scalar(
        "SELECT encrypted_value FROM secrets WHERE server_id = 'github' AND key = 'GITHUB_PERSONAL_ACCESS_TOKEN'",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert!(!raw.windows(4).any(|w| w == b"ghp_"));

    let value = core
        .secrets()
        .get("github", "GITHUB_PERSONAL_ACCESS_TOKEN")
        .await
        .unwrap();
    assert_eq!(value.expose(), github_token()["GITHUB_PERSONAL_ACCESS_TOKEN"]);
}

#[tokio::test]
async fn seeding_twice_adds_nothing() {
    let db = TestDb::new().await.unwrap();
    let core = seeded(db.pool().clone()).await;

    let added = core.registry().seed_catalog(&builtin_servers()).await.unwrap();
    assert_eq!(added, 0);
    assert_eq!(core.registry().list().await.unwrap().len(), builtin_servers().len());
}

#[tokio::test]
async fn state_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("switchyard.db");

    {
        let pool = setup_database(&path).await.unwrap();
        let core = seeded(pool.clone()).await;
        core.activation()
            .submit(
                "github",
                &github_token(),
                SubmitOptions {
                    auto_enable: true,
                    ..SubmitOptions::default()
                },
            )
            .await
            .unwrap();
        core.reconciler().set_enabled("fetch", false).await.unwrap();
        pool.close().await;
    }

    let pool = setup_database(&path).await.unwrap();
    let core = seeded(pool).await;

    let github = core.reconciler().view("github").await.unwrap();
    assert_eq!(github.status, ServerStatus::Active);
    assert!(!core.reconciler().view("fetch").await.unwrap().enabled);

    let doc = core.render_current(ClientTarget::McpServers).await.unwrap();
    assert_eq!(
        doc.env_of("github").unwrap()["GITHUB_PERSONAL_ACCESS_TOKEN"],
        github_token()["GITHUB_PERSONAL_ACCESS_TOKEN"]
    );
    assert!(!doc.server_ids().contains(&"fetch".to_string()));
}

#[tokio::test]
async fn wrong_master_key_cannot_render_credentials() {
    let db = TestDb::new().await.unwrap();
    let core = seeded(db.pool().clone()).await;
    core.activation()
        .submit(
            "github",
            &github_token(),
            SubmitOptions {
                auto_enable: true,
                ..SubmitOptions::default()
            },
        )
        .await
        .unwrap();

    let other = GatewayCore::new(
        db.repos(),
        GatewayDeps::new(
            Arc::new(AesGcmCipher::from_master_key("not the key").unwrap()),
            Arc::new(SchemaRegistry::builtin().unwrap()),
        ),
    );
    assert!(other.render_current(ClientTarget::McpServers).await.is_err());
}

#[tokio::test]
async fn removing_custom_server_leaves_no_orphans() {
    let db = TestDb::new().await.unwrap();
    let core = seeded(db.pool().clone()).await;

    let custom = switchyard_core::ServerDescriptor::new(
        "internal-api",
        "Internal API",
        switchyard_core::LaunchSpec::new("node", ["server.js"]),
    );
    core.registry().add(custom).await.unwrap();
    core.secrets().put("internal-api", "API_KEY", "k").await.unwrap();
    core.reconciler().set_enabled("internal-api", true).await.unwrap();

    let summary = core.registry().remove("internal-api").await.unwrap();
    assert_eq!(summary.secrets_deleted, 1);
    assert!(summary.toggle_deleted);
    assert!(core.registry().orphans().await.unwrap().is_empty());
}
