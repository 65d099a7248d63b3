use anyhow::{Context, Result};
use clap::Parser;
use dynamo_console::config::Settings;
use dynamo_console::logging;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(format) = cli.log_format {
        settings.log_format = format;
    }
    logging::init_tracing(settings.log_format, cli.verbose);

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(settings, args).await?,

        Commands::Tables { region } => commands::tables::execute(settings, region).await?,

        Commands::Scan {
            table,
            limit,
            region,
            json,
        } => commands::scan::execute(settings, table, limit, region, json).await?,

        Commands::Profiles { action } => commands::profiles::execute(action)?,
    }

    Ok(())
}
