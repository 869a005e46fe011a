//! Render command handler.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use switchyard_core::{ClientTarget, CoreError};

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Render the client configuration document for `target`.
///
/// Writes to `output` when given (owner-only permissions on unix), else
/// to stdout.
///
/// # Errors
///
/// Returns an error if a credential cannot be decrypted or the file
/// cannot be written.
pub async fn execute(ctx: &CliContext, target: ClientTarget, output: Option<&Path>) -> Result<()> {
    let document = ctx.core().render_current(target).await.map_err(CliError::from)?;
    let text = document
        .to_pretty_string()
        .map_err(|e| CliError::from(CoreError::from(e)))?;

    let Some(path) = output else {
        println!("{text}");
        return Ok(());
    };

    write_private(path, &text)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!(
        "Wrote {} config with {} server(s) to {}",
        target.as_str(),
        document.server_ids().len(),
        path.display()
    );
    Ok(())
}

/// The rendered document contains plaintext credentials.
fn write_private(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{text}\n"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
