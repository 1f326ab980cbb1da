//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use autoload_coordinator::util::config::HOST_CONFIG_NAME;

/// Inspect how shared module dependencies are arbitrated
#[derive(Parser)]
#[command(name = "coordinator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Host configuration file
    #[arg(
        long,
        global = true,
        env = "AUTOLOAD_COORDINATOR_CONFIG",
        default_value = HOST_CONFIG_NAME
    )]
    pub config: PathBuf,

    /// Directory for the persisted package cache
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Keep caches in memory only
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bootstrap the configured modules and report every decision
    Inspect(InspectArgs),

    /// Scan bundled packages and show the highest version of each
    Index(IndexArgs),

    /// Show which file a class resolves to
    Resolve(ResolveArgs),

    /// Manage the persisted package cache
    Cache(CacheArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Fully qualified class name
    pub class: String,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Drop cached package data for the configured modules
    Clear,

    /// Print the cache directory
    Path,
}

/// Options shared by every command.
pub struct GlobalOpts {
    pub config: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub no_cache: bool,
}

impl Cli {
    pub fn global(&self) -> GlobalOpts {
        GlobalOpts {
            config: self.config.clone(),
            cache_dir: self.cache_dir.clone(),
            no_cache: self.no_cache,
        }
    }
}
