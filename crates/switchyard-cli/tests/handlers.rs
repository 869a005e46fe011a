//! Handler flows over an in-memory database.

use std::sync::Arc;

use switchyard_cli::handlers::configure::{self, ConfigureArgs};
use switchyard_cli::handlers::servers::{self, AddArgs};
use switchyard_cli::handlers::toggle::{self, ToggleAction};
use switchyard_cli::handlers::{render, secrets};
use switchyard_cli::{CliContext, bootstrap::bootstrap_with, error::exit_code_for};
use switchyard_core::catalog::builtin_servers;
use switchyard_core::ports::{LockedCipher, SecretCipher};
use switchyard_core::testing::ScriptedSupervisor;
use switchyard_core::{ClientTarget, GatewayConfig, GatewayDeps, SchemaRegistry, ServerStatus};
use switchyard_crypto::AesGcmCipher;
use switchyard_db::{CoreFactory, TestDb};

const MASTER_KEY: &str = "cli-test-master-key";

async fn context(master_key: Option<&str>) -> (CliContext, tempfile::TempDir) {
    let (ctx, dir, _) = context_with_supervisor(master_key).await;
    (ctx, dir)
}

async fn context_with_supervisor(
    master_key: Option<&str>,
) -> (CliContext, tempfile::TempDir, Arc<ScriptedSupervisor>) {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().to_string_lossy().into_owned();
    let key = master_key.map(str::to_string);
    let config = GatewayConfig::from_lookup(|var| match var {
        "SWITCHYARD_DATA_DIR" => Some(data_dir.clone()),
        "SWITCHYARD_MASTER_KEY" => key.clone(),
        _ => None,
    })
    .unwrap();

    let cipher: Arc<dyn SecretCipher> = match master_key {
        Some(key) => Arc::new(AesGcmCipher::from_master_key(key).unwrap()),
        None => Arc::new(LockedCipher),
    };
    let supervisor = Arc::new(ScriptedSupervisor::succeeding("restarted"));
    let deps = GatewayDeps::new(cipher, Arc::new(SchemaRegistry::builtin().unwrap()))
        .with_supervisor(supervisor.clone());
    let db = TestDb::new().await.unwrap();
    let core = CoreFactory::build_gateway_core(db.pool().clone(), deps);
    core.registry().seed_catalog(&builtin_servers()).await.unwrap();

    (bootstrap_with(core, config), dir, supervisor)
}

fn github_args(enable: bool) -> ConfigureArgs {
    ConfigureArgs {
        server_id: "github".to_string(),
        values: vec![(
            "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
            format!("ghp_{}", "b".repeat(36)),
        )],
        probe: None,
        enable,
        no_reload: true,
    }
}

#[tokio::test]
async fn enabling_without_credentials_exits_with_noperm() {
    let (ctx, _dir) = context(Some(MASTER_KEY)).await;

    let err = toggle::execute(&ctx, "github", ToggleAction::Enable, true)
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&err), 77);
}

#[tokio::test]
async fn configure_with_enable_activates_and_renders() {
    let (ctx, dir) = context(Some(MASTER_KEY)).await;

    configure::execute(&ctx, github_args(true)).await.unwrap();
    let view = ctx.core().reconciler().view("github").await.unwrap();
    assert_eq!(view.status, ServerStatus::Active);

    let out = dir.path().join("client/mcp.json");
    render::execute(&ctx, ClientTarget::McpServers, Some(out.as_path()))
        .await
        .unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("\"github\""));
    assert!(text.contains(&"b".repeat(36)));
}

#[tokio::test]
async fn configure_is_refused_while_locked() {
    let (ctx, _dir) = context(None).await;

    let err = configure::execute(&ctx, github_args(false)).await.unwrap_err();
    assert_eq!(exit_code_for(&err), 78);
    assert!(ctx.core().inspector().list_keys("github").await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_credential_is_input_error() {
    let (ctx, _dir) = context(Some(MASTER_KEY)).await;
    let mut args = github_args(false);
    args.values[0].1 = "not-a-token".to_string();

    let err = configure::execute(&ctx, args).await.unwrap_err();
    assert_eq!(exit_code_for(&err), 65);
}

#[tokio::test]
async fn forgetting_unknown_key_is_input_error() {
    let (ctx, _dir) = context(Some(MASTER_KEY)).await;

    let err = secrets::forget(&ctx, "github", Some("NOPE"), true).await.unwrap_err();
    assert_eq!(exit_code_for(&err), 65);
}

#[tokio::test]
async fn forgetting_credentials_drops_server_from_render() {
    let (ctx, _dir) = context(Some(MASTER_KEY)).await;
    configure::execute(&ctx, github_args(true)).await.unwrap();

    secrets::forget(&ctx, "github", None, true).await.unwrap();

    let view = ctx.core().reconciler().view("github").await.unwrap();
    assert_eq!(view.status, ServerStatus::Error);
    let doc = ctx.core().render_current(ClientTarget::McpServers).await.unwrap();
    assert!(!doc.server_ids().contains(&"github".to_string()));
}

#[tokio::test]
async fn custom_server_add_and_remove() {
    let (ctx, _dir) = context(Some(MASTER_KEY)).await;
    let args = AddArgs {
        id: "weather".to_string(),
        name: "Weather".to_string(),
        description: String::new(),
        recommended: true,
        launch: vec!["npx".to_string(), "weather-mcp".to_string()],
    };

    servers::add(&ctx, args, true).await.unwrap();
    let view = ctx.core().reconciler().view("weather").await.unwrap();
    assert_eq!(view.status, ServerStatus::Active);

    servers::remove(&ctx, "weather", true).await.unwrap();
    let err = servers::remove(&ctx, "weather", true).await.unwrap_err();
    assert_eq!(exit_code_for(&err), 65);
}

#[tokio::test]
async fn builtin_servers_cannot_be_removed() {
    let (ctx, _dir) = context(Some(MASTER_KEY)).await;
    let builtin = builtin_servers().into_iter().find(|s| s.builtin).unwrap();

    let err = servers::remove(&ctx, &builtin.id, true).await.unwrap_err();
    assert_eq!(exit_code_for(&err), 65);
}

fn custom(id: &str, recommended: bool) -> AddArgs {
    AddArgs {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        recommended,
        launch: vec!["npx".to_string(), format!("{id}-mcp")],
    }
}

#[tokio::test]
async fn adding_and_removing_an_active_server_reloads_the_gateway() {
    let (ctx, _dir, supervisor) = context_with_supervisor(Some(MASTER_KEY)).await;

    servers::add(&ctx, custom("weather", true), false).await.unwrap();
    assert_eq!(supervisor.calls(), 1);

    servers::remove(&ctx, "weather", false).await.unwrap();
    assert_eq!(supervisor.calls(), 2);
}

#[tokio::test]
async fn inactive_servers_do_not_trigger_a_reload() {
    let (ctx, _dir, supervisor) = context_with_supervisor(Some(MASTER_KEY)).await;

    servers::add(&ctx, custom("quiet", false), false).await.unwrap();
    servers::remove(&ctx, "quiet", false).await.unwrap();
    assert_eq!(supervisor.calls(), 0);
}

#[tokio::test]
async fn forgetting_credentials_of_an_active_server_reloads_unless_opted_out() {
    let (ctx, _dir, supervisor) = context_with_supervisor(Some(MASTER_KEY)).await;
    configure::execute(&ctx, github_args(true)).await.unwrap();
    assert_eq!(supervisor.calls(), 0, "configure ran with --no-reload");

    secrets::forget(&ctx, "github", None, true).await.unwrap();
    assert_eq!(supervisor.calls(), 0);

    configure::execute(&ctx, github_args(true)).await.unwrap();
    secrets::forget(&ctx, "github", Some("GITHUB_PERSONAL_ACCESS_TOKEN"), false)
        .await
        .unwrap();
    assert_eq!(supervisor.calls(), 1);
}

#[tokio::test]
async fn forgetting_for_unknown_server_is_input_error() {
    let (ctx, _dir) = context(Some(MASTER_KEY)).await;

    let err = secrets::forget(&ctx, "no-such-server", None, true).await.unwrap_err();
    assert_eq!(exit_code_for(&err), 65);
}
