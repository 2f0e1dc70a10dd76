//! Folio CLI - staged-content blog engine.
//!
//! Provides commands for:
//! - `refresh`: ingest staged content now and print a summary
//! - `show`: resolve an address the way a request would
//! - `tree`: print a serialized navigation tree

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RefreshArgs, ShowArgs, TreeArgs};
use output::Output;

/// Folio - staged-content blog engine.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about)]
struct Cli {
    /// Enable verbose output (ingestion and refresh logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest staged content immediately.
    Refresh(RefreshArgs),
    /// Resolve an address and print the selected document.
    Show(ShowArgs),
    /// Print the navigation tree.
    Tree(TreeArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Refresh(args) => args.execute(),
        Commands::Show(args) => args.execute(),
        Commands::Tree(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
