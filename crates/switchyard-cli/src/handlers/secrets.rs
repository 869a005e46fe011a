//! Secret listing and deletion handlers. Values are never printed.

use anyhow::Result;

use super::reload_after_change;
use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{print_json, print_separator};

/// List stored credential keys for one server.
///
/// # Errors
///
/// Returns an error if the server is unknown or storage cannot be read.
pub async fn list(ctx: &CliContext, server_id: &str, json: bool) -> Result<()> {
    // Resolve first so an unknown id is an error rather than an empty list.
    ctx.core()
        .reconciler()
        .view(server_id)
        .await
        .map_err(CliError::from)?;

    let secrets = ctx
        .core()
        .inspector()
        .metadata(server_id)
        .await
        .map_err(CliError::from)?;

    if json {
        return print_json(&secrets);
    }

    if secrets.is_empty() {
        println!("No credentials stored for {server_id}.");
        return Ok(());
    }

    println!("{:<36} {:<10} Updated", "Key", "Value");
    print_separator(70);
    for secret in &secrets {
        println!(
            "{:<36} {:<10} {}",
            secret.key,
            secret.masked_value,
            secret.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// Delete one credential, or every credential of the server.
///
/// Reloads the gateway when the server was active, since its rendered
/// entry changes or disappears.
///
/// # Errors
///
/// Returns an input error for an unknown server or a key that is not stored.
pub async fn forget(
    ctx: &CliContext,
    server_id: &str,
    key: Option<&str>,
    no_reload: bool,
) -> Result<()> {
    let before = ctx
        .core()
        .reconciler()
        .view(server_id)
        .await
        .map_err(CliError::from)?;

    let secrets = ctx.core().secrets();
    match key {
        Some(key) => {
            if !secrets.delete(server_id, key).await.map_err(CliError::from)? {
                return Err(CliError::Input(format!(
                    "No secret '{key}' stored for server '{server_id}'"
                ))
                .into());
            }
            println!("Deleted {key} for {server_id}.");
        }
        None => {
            let count = secrets.delete_server(server_id).await.map_err(CliError::from)?;
            println!("Deleted {count} credential(s) for {server_id}.");
            if count == 0 {
                return Ok(());
            }
        }
    }

    // The server may still be enabled with a now-incomplete set.
    match ctx.core().reconciler().view(server_id).await {
        Ok(view) if view.enabled && !view.readiness.is_ready() => {
            eprintln!(
                "Warning: {server_id} is enabled but missing {}; it will not be rendered.",
                view.missing_keys.join(", ")
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(
                server_id = %server_id,
                error = %e,
                "Could not re-read server state after delete"
            );
        }
    }

    if before.is_active() {
        reload_after_change(ctx, no_reload).await;
    }
    Ok(())
}
