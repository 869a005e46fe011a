//! Configure command handler: validate, store and optionally enable.

use std::collections::BTreeMap;

use anyhow::Result;

use switchyard_core::{ProbeMode, SubmitOptions};

use super::reload_after_change;
use crate::bootstrap::CliContext;
use crate::commands::ProbeArg;
use crate::error::CliError;

/// Arguments of the configure command.
#[derive(Debug)]
pub struct ConfigureArgs {
    pub server_id: String,
    pub values: Vec<(String, String)>,
    pub probe: Option<ProbeArg>,
    pub enable: bool,
    pub no_reload: bool,
}

/// Collect `KEY=VALUE` pairs, rejecting a key given twice.
pub fn collect_values(values: Vec<(String, String)>) -> Result<BTreeMap<String, String>, CliError> {
    let mut map = BTreeMap::new();
    for (key, value) in values {
        if map.contains_key(&key) {
            return Err(CliError::Input(format!("Field given more than once: {key}")));
        }
        map.insert(key, value);
    }
    Ok(map)
}

/// Execute the configure command.
///
/// # Errors
///
/// Returns validation, probe, gating and storage errors from the
/// activation pipeline.
pub async fn execute(ctx: &CliContext, args: ConfigureArgs) -> Result<()> {
    ctx.require_unlocked()?;

    let values = collect_values(args.values)?;
    let options = SubmitOptions {
        probe: args.probe.map_or(ProbeMode::Skip, Into::into),
        auto_enable: args.enable,
    };

    let outcome = ctx
        .core()
        .activation()
        .submit(&args.server_id, &values, options)
        .await
        .map_err(CliError::from)?;

    if outcome.stored_keys.is_empty() {
        println!("Nothing to store for {}.", outcome.server_id);
        return Ok(());
    }

    println!(
        "Stored {} for {}.",
        outcome.stored_keys.join(", "),
        outcome.server_id
    );
    if let Some(probe) = &outcome.probe {
        println!("Connectivity check: {}", probe.message);
    }

    let view = match outcome.enabled {
        Some(view) => view,
        None => ctx
            .core()
            .reconciler()
            .view(&outcome.server_id)
            .await
            .map_err(CliError::from)?,
    };
    println!("{} is {}.", view.id(), view.status.as_str());

    // Active servers pick up new credentials only after a reload.
    if view.is_active() {
        reload_after_change(ctx, args.no_reload).await;
    } else if !view.missing_keys.is_empty() {
        println!("Still missing: {}", view.missing_keys.join(", "));
    }
    Ok(())
}
