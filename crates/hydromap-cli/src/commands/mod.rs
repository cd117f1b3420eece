//! Command implementations

mod cache;
mod config;
mod delineate;
mod status;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = load_config(cli.overrides.into())?;

    match cli.command {
        Commands::Status => status::execute(&config, &output),
        Commands::Delineate(args) => delineate::execute(args, &config, &output).await,
        Commands::Cache(args) => cache::execute(args, &config, &output).await,
        Commands::Config => config::execute(&config, &output),
    }
}
