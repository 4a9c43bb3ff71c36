mod cli;
mod config;
mod error;
mod importer;
mod metadata;
mod model;
mod providers;
mod resolver;
mod schema;
mod sheet;
mod util;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("cartollero=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    // Load config once; every component receives it explicitly
    let config = config::load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Import(args) => cli::handle_import(&config, args).await,
        Commands::Boards => cli::handle_boards(&config).await,
        Commands::Lists { board_id } => cli::handle_lists(&config, board_id).await,
        Commands::Discover => cli::handle_discover(&config).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
