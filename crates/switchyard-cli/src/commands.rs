//! Main commands enum.

use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};

use switchyard_core::{ClientTarget, ProbeMode};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List every known server with its effective state
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one server: state, credential fields and stored keys
    Show {
        server_id: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Enable a server (fails until its credentials are stored)
    Enable {
        server_id: String,
        /// Do not reload the gateway afterwards
        #[arg(long)]
        no_reload: bool,
    },

    /// Disable a server
    Disable {
        server_id: String,
        /// Do not reload the gateway afterwards
        #[arg(long)]
        no_reload: bool,
    },

    /// Drop the explicit choice so the recommended default applies again
    Reset {
        server_id: String,
        /// Do not reload the gateway afterwards
        #[arg(long)]
        no_reload: bool,
    },

    /// Validate and store credentials for a server
    Configure {
        server_id: String,
        /// Credential values as KEY=VALUE
        #[arg(value_parser = parse_assignment, required = true)]
        values: Vec<(String, String)>,
        /// Run a connectivity check before or after storing
        #[arg(long, value_enum)]
        probe: Option<ProbeArg>,
        /// Enable the server once its credentials are stored
        #[arg(long)]
        enable: bool,
        /// Do not reload the gateway afterwards
        #[arg(long)]
        no_reload: bool,
    },

    /// List stored credential keys for a server (values are never shown)
    Secrets {
        server_id: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete one stored credential, or all of a server's credentials
    Forget {
        server_id: String,
        /// Only delete this key
        key: Option<String>,
        /// Do not reload the gateway afterwards
        #[arg(long)]
        no_reload: bool,
    },

    /// Render the client configuration document for the active servers
    Render {
        #[arg(value_enum)]
        target: TargetArg,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask the gateway to reload its configuration
    Reload,

    /// Show gateway status and a summary of server states
    Status,

    /// Register a custom server
    Add {
        /// Identifier ([a-z0-9_-])
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Enable by default when no explicit choice exists
        #[arg(long)]
        recommended: bool,
        /// Do not reload the gateway afterwards
        #[arg(long)]
        no_reload: bool,
        /// Launch command and arguments, after `--`
        #[arg(last = true, required = true)]
        launch: Vec<String>,
    },

    /// Remove a custom server with its credentials and toggle
    Remove {
        server_id: String,
        /// Do not reload the gateway afterwards
        #[arg(long)]
        no_reload: bool,
    },

    /// Report credentials or toggles whose server no longer exists
    Orphans,

    /// Generate a new master key for SWITCHYARD_MASTER_KEY
    Keygen,
}

/// When to run the connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProbeArg {
    Before,
    After,
}

impl From<ProbeArg> for ProbeMode {
    fn from(arg: ProbeArg) -> Self {
        match arg {
            ProbeArg::Before => Self::BeforePersist,
            ProbeArg::After => Self::AfterPersist,
        }
    }
}

/// Client configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    McpServers,
    Zed,
    ServerList,
    Dotted,
}

impl From<TargetArg> for ClientTarget {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::McpServers => Self::McpServers,
            TargetArg::Zed => Self::Zed,
            TargetArg::ServerList => Self::ServerList,
            TargetArg::Dotted => Self::Dotted,
        }
    }
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err("credential key must not be empty".to_string());
    }
    Ok((key.trim().to_string(), value.to_string()))
}
