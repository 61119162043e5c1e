//! Placementrag CLI
//!
//! Ask questions about internship and placement postings.

use anyhow::Result;
use clap::Parser;
use placementrag_core::error::exit_codes;
use placementrag_core::{Config, PlacementError};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<PlacementError>()
            .map_or(exit_codes::GENERAL_ERROR, PlacementError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Ask(args) => commands::ask::run(args, &config, cli.format, cli.verbose).await,
        Commands::Chat(args) => commands::chat::run(args, &config, cli.format, cli.verbose).await,
        Commands::Companies => commands::companies::run(&config, cli.format).await,
        Commands::Status => commands::status::run(&config, cli.format).await,
    }
}
