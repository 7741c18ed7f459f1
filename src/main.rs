//! Arbiter CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use arbiter::cli::{Cli, Commands};
use arbiter::infrastructure::config::ConfigLoader;
use arbiter::infrastructure::logging::{LogConfig, LoggerImpl};
use arbiter::services::EngineContext;

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))
        .context("Failed to initialize logging")?;

    let engine = EngineContext::from_config(&config.judge)
        .context("Failed to set up the judge client")?;

    match cli.command {
        Commands::Evaluate(args) => {
            arbiter::cli::commands::evaluate::execute(args, config, engine, cli.json).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        arbiter::cli::handle_error(err, json_mode);
    }
}
