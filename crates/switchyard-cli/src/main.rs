//! CLI entry point.
//!
//! Wiring happens in [`bootstrap`]; this file parses arguments, sets up
//! logging and dispatches to handlers.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use switchyard_cli::handlers::{self, configure::ConfigureArgs, servers::AddArgs, toggle::ToggleAction};
use switchyard_cli::{Cli, Commands, bootstrap, bootstrap::load_config, error::exit_code_for};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = u8::try_from(exit_code_for(&err)).unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    // Keygen must work before any key or database exists.
    if matches!(command, Commands::Keygen) {
        handlers::keygen::execute();
        return Ok(());
    }

    let config = load_config(cli.data_dir.as_deref())?;
    let ctx = bootstrap(config).await?;

    match command {
        Commands::List { json } => handlers::list::execute(&ctx, json).await,
        Commands::Show { server_id, json } => handlers::show::execute(&ctx, &server_id, json).await,
        Commands::Enable { server_id, no_reload } => {
            handlers::toggle::execute(&ctx, &server_id, ToggleAction::Enable, no_reload).await
        }
        Commands::Disable { server_id, no_reload } => {
            handlers::toggle::execute(&ctx, &server_id, ToggleAction::Disable, no_reload).await
        }
        Commands::Reset { server_id, no_reload } => {
            handlers::toggle::execute(&ctx, &server_id, ToggleAction::Reset, no_reload).await
        }
        Commands::Configure {
            server_id,
            values,
            probe,
            enable,
            no_reload,
        } => {
            let args = ConfigureArgs {
                server_id,
                values,
                probe,
                enable,
                no_reload,
            };
            handlers::configure::execute(&ctx, args).await
        }
        Commands::Secrets { server_id, json } => {
            handlers::secrets::list(&ctx, &server_id, json).await
        }
        Commands::Forget {
            server_id,
            key,
            no_reload,
        } => handlers::secrets::forget(&ctx, &server_id, key.as_deref(), no_reload).await,
        Commands::Render { target, output } => {
            handlers::render::execute(&ctx, target.into(), output.as_deref()).await
        }
        Commands::Reload => handlers::gateway::reload(&ctx).await,
        Commands::Status => handlers::gateway::status(&ctx).await,
        Commands::Add {
            id,
            name,
            description,
            recommended,
            no_reload,
            launch,
        } => {
            let args = AddArgs {
                id,
                name,
                description,
                recommended,
                launch,
            };
            handlers::servers::add(&ctx, args, no_reload).await
        }
        Commands::Remove {
            server_id,
            no_reload,
        } => handlers::servers::remove(&ctx, &server_id, no_reload).await,
        Commands::Orphans => handlers::servers::orphans(&ctx).await,
        // Handled before bootstrap.
        Commands::Keygen => Ok(()),
    }
}
