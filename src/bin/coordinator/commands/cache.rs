//! `coordinator cache` command
//!
//! Manage the persisted package cache (package index and init-file groups).

use anyhow::{bail, Result};

use super::{cache_dir, open_session};
use crate::cli::{CacheArgs, CacheCommands, GlobalOpts};

pub fn execute(opts: &GlobalOpts, args: CacheArgs) -> Result<()> {
    match args.command {
        CacheCommands::Clear => clear_cache(opts),
        CacheCommands::Path => show_path(opts),
    }
}

/// Drop the entries belonging to the configured module set.
fn clear_cache(opts: &GlobalOpts) -> Result<()> {
    let mut session = open_session(opts)?;
    session.coordinator.invalidate_cache();
    eprintln!(
        "     Cleared cached package data for {} modules",
        session.config.modules.len()
    );
    Ok(())
}

fn show_path(opts: &GlobalOpts) -> Result<()> {
    match cache_dir(opts) {
        Some(dir) => {
            println!("{}", dir.display());
            Ok(())
        }
        None => bail!("no cache directory available on this platform"),
    }
}
