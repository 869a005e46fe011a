//! Command handlers that delegate to `GatewayCore`.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that convert CLI input, call the core and format output
//!
//! Handlers should not touch repositories or hold business rules.

pub mod configure;
pub mod gateway;
pub mod keygen;
pub mod list;
pub mod render;
pub mod secrets;
pub mod servers;
pub mod show;
pub mod toggle;

use switchyard_core::ReloadOutcome;

use crate::bootstrap::CliContext;

/// Reload the gateway after a state change unless the user opted out.
///
/// A failed reload is reported as a warning; the saved state stands.
pub(crate) async fn reload_after_change(ctx: &CliContext, no_reload: bool) -> Option<ReloadOutcome> {
    if no_reload {
        println!("Skipped gateway reload (run `switchyard reload` to apply).");
        return None;
    }
    let outcome = ctx.core().restart().request_reload().await;
    match &outcome {
        ReloadOutcome::Reloaded { detail } => println!("Gateway reloaded: {detail}"),
        ReloadOutcome::Failed { warning } => eprintln!("Warning: {warning}"),
    }
    Some(outcome)
}
