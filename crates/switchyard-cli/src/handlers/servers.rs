//! Custom server registration handlers.

use anyhow::Result;

use switchyard_core::{LaunchSpec, ServerDescriptor};

use super::reload_after_change;
use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Arguments of the add command.
#[derive(Debug)]
pub struct AddArgs {
    pub id: String,
    pub name: String,
    pub description: String,
    pub recommended: bool,
    pub launch: Vec<String>,
}

impl AddArgs {
    /// Build the descriptor for a custom server.
    pub fn into_descriptor(self) -> Result<ServerDescriptor, CliError> {
        let mut launch = self.launch.into_iter();
        let command = launch
            .next()
            .ok_or_else(|| CliError::Input("A launch command is required".to_string()))?;

        Ok(
            ServerDescriptor::new(self.id, self.name, LaunchSpec::new(command, launch))
                .with_description(self.description)
                .with_recommended(self.recommended),
        )
    }
}

/// Register a custom server, reloading the gateway if it starts active.
///
/// # Errors
///
/// Returns an error for duplicate ids or invalid descriptors.
pub async fn add(ctx: &CliContext, args: AddArgs, no_reload: bool) -> Result<()> {
    let descriptor = args.into_descriptor()?;
    let added = ctx
        .core()
        .registry()
        .add(descriptor)
        .await
        .map_err(CliError::from)?;

    println!("Added {} ({}).", added.name, added.id);

    let view = ctx
        .core()
        .reconciler()
        .view(&added.id)
        .await
        .map_err(CliError::from)?;
    if view.is_active() {
        reload_after_change(ctx, no_reload).await;
    } else {
        println!("Enable it with: switchyard enable {}", added.id);
    }
    Ok(())
}

/// Remove a custom server with its credentials and toggle.
///
/// # Errors
///
/// Returns an error for unknown or built-in servers.
pub async fn remove(ctx: &CliContext, server_id: &str, no_reload: bool) -> Result<()> {
    let was_active = ctx
        .core()
        .reconciler()
        .view(server_id)
        .await
        .map_err(CliError::from)?
        .is_active();

    let summary = ctx
        .core()
        .registry()
        .remove(server_id)
        .await
        .map_err(CliError::from)?;

    println!(
        "Removed {server_id} ({} credential(s){}).",
        summary.secrets_deleted,
        if summary.toggle_deleted { ", toggle" } else { "" }
    );
    if was_active {
        reload_after_change(ctx, no_reload).await;
    }
    Ok(())
}

/// Report secrets or toggles that point at servers no longer registered.
///
/// # Errors
///
/// Returns an error if storage cannot be read.
pub async fn orphans(ctx: &CliContext) -> Result<()> {
    let report = ctx
        .core()
        .registry()
        .orphans()
        .await
        .map_err(CliError::from)?;

    if report.is_empty() {
        println!("No orphaned credentials or toggles.");
        return Ok(());
    }
    for id in &report.secret_server_ids {
        println!("credentials for unknown server: {id}");
    }
    for id in &report.toggle_server_ids {
        println!("toggle for unknown server: {id}");
    }
    println!("Clean up with: switchyard forget <server-id>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::ServerCategory;

    #[test]
    fn test_add_args_build_custom_descriptor() {
        let descriptor = AddArgs {
            id: "weather".to_string(),
            name: "Weather".to_string(),
            description: "Forecasts".to_string(),
            recommended: true,
            launch: vec!["npx".to_string(), "-y".to_string(), "weather-mcp".to_string()],
        }
        .into_descriptor()
        .unwrap();

        assert_eq!(descriptor.category, ServerCategory::Custom);
        assert!(!descriptor.builtin);
        assert!(descriptor.recommended);
        assert_eq!(descriptor.launch.command, "npx");
        assert_eq!(descriptor.launch.args, ["-y", "weather-mcp"]);
    }

    #[test]
    fn test_add_args_without_launch_is_input_error() {
        let err = AddArgs {
            id: "x".to_string(),
            name: "X".to_string(),
            description: String::new(),
            recommended: false,
            launch: Vec::new(),
        }
        .into_descriptor()
        .unwrap_err();
        assert_eq!(err.exit_code(), 65);
    }
}
