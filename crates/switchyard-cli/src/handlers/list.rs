//! List command handler.
//!
//! Displays every registered server with its effective state.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{print_json, print_separator, status_symbol, truncate_string};

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the registry or toggle state cannot be read.
pub async fn execute(ctx: &CliContext, json: bool) -> Result<()> {
    let views = ctx.core().reconciler().list().await.map_err(CliError::from)?;

    if json {
        return print_json(&views);
    }

    if views.is_empty() {
        println!("No servers registered.");
        return Ok(());
    }

    println!(
        "  {:<22} {:<24} {:<14} {:<9} {:<18} Source",
        "ID", "Name", "Category", "Status", "Credentials"
    );
    print_separator(100);

    for view in &views {
        let credentials = if view.missing_keys.is_empty() {
            crate::presentation::readiness_label(view.readiness).to_string()
        } else {
            format!("missing {}", view.missing_keys.len())
        };
        println!(
            "{} {:<22} {:<24} {:<14} {:<9} {:<18} {}",
            status_symbol(view.status),
            truncate_string(view.id(), 22),
            truncate_string(&view.descriptor.name, 24),
            view.descriptor.category.as_str(),
            view.status.as_str(),
            truncate_string(&credentials, 18),
            if view.explicit { "explicit" } else { "default" },
        );
    }

    let active = views.iter().filter(|v| v.is_active()).count();
    println!("\n{active} of {} server(s) active.", views.len());
    Ok(())
}
