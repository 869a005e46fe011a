//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Manage tool servers, their credentials and the gateway configuration.
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Reconcile tool-server catalog, credentials and toggles for an MCP gateway")]
#[command(version)]
pub struct Cli {
    /// Override the data directory for this invocation
    #[arg(long = "data-dir", global = true, env = "SWITCHYARD_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
