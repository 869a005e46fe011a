//! Enable, disable and reset handlers.

use anyhow::Result;

use switchyard_core::EffectiveServerView;

use super::reload_after_change;
use crate::bootstrap::CliContext;
use crate::error::CliError;

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Enable,
    Disable,
    Reset,
}

/// Apply a toggle action and reload the gateway unless `no_reload`.
///
/// # Errors
///
/// Returns a gating error when enabling a server without its required
/// credentials, and storage errors otherwise.
pub async fn execute(
    ctx: &CliContext,
    server_id: &str,
    action: ToggleAction,
    no_reload: bool,
) -> Result<()> {
    let reconciler = ctx.core().reconciler();
    let view = match action {
        ToggleAction::Enable => reconciler.set_enabled(server_id, true).await,
        ToggleAction::Disable => reconciler.set_enabled(server_id, false).await,
        ToggleAction::Reset => reconciler.clear_override(server_id).await,
    }
    .map_err(CliError::from)?;

    println!("{}", describe(&view));
    reload_after_change(ctx, no_reload).await;
    Ok(())
}

fn describe(view: &EffectiveServerView) -> String {
    let source = if view.explicit { "" } else { " (catalog default)" };
    format!("{} is now {}{source}.", view.id(), view.status.as_str())
}
