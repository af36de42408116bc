//! Command executor for dispatching CLI commands

use super::handlers::{ServeCommandHandler, SetupCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::Settings;
use crate::error::AppResult;

/// Execute a CLI command with merged and validated settings.
///
/// With no subcommand the server starts with its defaults.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    warn_privileged_port(cli);

    match &cli.command {
        Some(Commands::Serve {
            dry_run,
            recreate_tables,
            ..
        }) => {
            ServeCommandHandler::new(settings)
                .execute(*dry_run, *recreate_tables)
                .await
        }
        None => ServeCommandHandler::new(settings).execute(false, false).await,
        Some(Commands::Setup { recreate }) => {
            SetupCommandHandler::new(settings).execute(*recreate).await
        }
    }
}

fn warn_privileged_port(cli: &Cli) {
    if let Some(Commands::Serve {
        port: Some(port), ..
    }) = &cli.command
        && *port < 1024
    {
        tracing::warn!(port, "Binding to a port below 1024 typically requires root privileges");
    }
}
