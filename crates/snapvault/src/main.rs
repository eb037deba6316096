//! Snapvault CLI - versioned, encrypted configuration snapshots
//!
//! This is the main entry point for the Snapvault command-line interface.

mod cli;
mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let config_dir = cli.config_dir.as_deref();
    match cli.command {
        Commands::Version(args) => commands::version::run(args),
        Commands::Snapshot(cmd) => commands::snapshot::run(cmd, config_dir).await,
        Commands::Rollback(args) => commands::rollback::run(args, config_dir).await,
        Commands::Component(cmd) => commands::component::run(cmd, config_dir).await,
        Commands::Key(cmd) => commands::key::run(cmd, config_dir),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
