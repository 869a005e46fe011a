//! Gateway reload and status handlers.

use anyhow::Result;

use switchyard_core::{GatewayStatus, ReloadOutcome, ServerStatus};

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Ask the gateway to reload.
///
/// # Errors
///
/// Returns a reload error when the supervisor reports failure.
pub async fn reload(ctx: &CliContext) -> Result<()> {
    match ctx.core().restart().request_reload().await {
        ReloadOutcome::Reloaded { detail } => {
            println!("Gateway reloaded: {detail}");
            Ok(())
        }
        ReloadOutcome::Failed { warning } => Err(CliError::Reload(warning).into()),
    }
}

/// Print gateway status and a count of server states.
///
/// # Errors
///
/// Returns an error if server state cannot be read.
pub async fn status(ctx: &CliContext) -> Result<()> {
    let gateway = ctx.core().restart().status().await;
    let views = ctx.core().reconciler().list().await.map_err(CliError::from)?;

    let count = |status: ServerStatus| views.iter().filter(|v| v.status == status).count();

    println!(
        "Gateway:   {} (service '{}' in {})",
        match gateway {
            GatewayStatus::Running => "running",
            GatewayStatus::Stopped => "stopped",
            GatewayStatus::Unknown => "unknown",
        },
        ctx.config().gateway_service,
        ctx.config().project_root.display()
    );
    println!("Data dir:  {}", ctx.config().data_dir.display());
    println!(
        "Secrets:   {}",
        if ctx.config().master_key.is_some() { "unlocked" } else { "locked" }
    );
    println!(
        "Servers:   {} active, {} inactive, {} error ({} total)",
        count(ServerStatus::Active),
        count(ServerStatus::Inactive),
        count(ServerStatus::Error),
        views.len()
    );

    for view in views.iter().filter(|v| v.status == ServerStatus::Error) {
        println!(
            "  ! {} is enabled but missing {}",
            view.id(),
            view.missing_keys.join(", ")
        );
    }
    Ok(())
}
