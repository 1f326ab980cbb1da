//! Coordinator CLI - inspect autoload arbitration for a host's modules

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("autoload_coordinator=debug")
    } else {
        EnvFilter::new("autoload_coordinator=info")
    };

    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let global = cli.global();
    match cli.command {
        Commands::Inspect(args) => commands::inspect::execute(&global, args),
        Commands::Index(args) => commands::index::execute(&global, args),
        Commands::Resolve(args) => commands::resolve::execute(&global, args),
        Commands::Cache(args) => commands::cache::execute(&global, args),
    }
}
