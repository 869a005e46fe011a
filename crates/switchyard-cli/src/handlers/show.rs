//! Show command handler.

use anyhow::Result;
use serde_json::json;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{format_optional, print_json, readiness_label};

/// Execute the show command for one server.
///
/// # Errors
///
/// Returns an error if the server is unknown or storage cannot be read.
pub async fn execute(ctx: &CliContext, server_id: &str, json: bool) -> Result<()> {
    let core = ctx.core();
    let view = core.reconciler().view(server_id).await.map_err(CliError::from)?;
    let schema = core.schemas().get_schema(server_id);
    let secrets = core
        .inspector()
        .metadata(server_id)
        .await
        .map_err(CliError::from)?;

    if json {
        return print_json(&json!({
            "server": view,
            "schema": schema,
            "secrets": secrets,
        }));
    }

    let d = &view.descriptor;
    println!("{} ({})", d.name, d.id);
    if !d.description.is_empty() {
        println!("  {}", d.description);
    }
    println!();
    println!("Category:     {}", d.category.as_str());
    println!(
        "Status:       {} ({})",
        view.status.as_str(),
        if view.explicit { "explicit choice" } else { "catalog default" }
    );
    println!("Credentials:  {}", readiness_label(view.readiness));
    println!("Launch:       {} {}", d.launch.command, d.launch.args.join(" "));

    if let Some(schema) = schema {
        println!();
        println!("Fields:");
        for field in &schema.fields {
            let stored = if view.configured_keys.contains(&field.key) {
                "stored"
            } else if field.required {
                "MISSING"
            } else {
                "-"
            };
            println!(
                "  {:<32} {:<8} {:<9} {}",
                field.key,
                if field.required { "required" } else { "optional" },
                stored,
                field.label
            );
            if let Some(help) = &field.help_text {
                println!("  {:<32} {help}", "");
            }
        }
        println!(
            "Docs:         {}",
            format_optional(schema.documentation_url.as_ref(), "--")
        );
    } else if !secrets.is_empty() {
        println!();
        println!(
            "Stored keys:  {}",
            secrets.iter().map(|s| s.key.as_str()).collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}
