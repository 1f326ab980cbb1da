//! Command implementations

pub mod cache;
pub mod index;
pub mod inspect;
pub mod resolve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::cli::GlobalOpts;
use autoload_coordinator::ops::RecordingExecutor;
use autoload_coordinator::util::config::default_cache_dir;
use autoload_coordinator::{
    CacheStore, Coordinator, FileCache, HostConfig, LoaderHost, MappingLoaderFactory, MemoryCache,
};

/// A coordinator wired to in-process collaborators.
///
/// Init files are recorded, never run.
pub struct Session {
    pub config: HostConfig,
    pub coordinator: Coordinator,
    pub host: LoaderHost,
}

/// Load the host configuration and register its modules.
pub fn open_session(opts: &GlobalOpts) -> Result<Session> {
    let path = if opts.config.is_absolute() {
        opts.config.clone()
    } else {
        std::env::current_dir()
            .context("failed to read current directory")?
            .join(&opts.config)
    };
    if !path.exists() {
        bail!(
            "could not find {}\n\
             help: pass --config or set AUTOLOAD_COORDINATOR_CONFIG",
            path.display()
        );
    }
    let mut config = HostConfig::load(&path)?;
    config.coordinator = config.coordinator.with_env_overrides();

    let host = LoaderHost::new();
    let mut coordinator = Coordinator::new(config.coordinator.clone())
        .with_cache(open_cache(opts)?)
        .with_loader_factory(MappingLoaderFactory::new(host.clone()))
        .with_executor(RecordingExecutor::new());

    for module in &config.modules {
        coordinator.register(module.clone());
    }
    tracing::debug!("registered {} modules", config.modules.len());

    Ok(Session {
        config,
        coordinator,
        host,
    })
}

/// The persisted cache directory, if any.
pub fn cache_dir(opts: &GlobalOpts) -> Option<PathBuf> {
    opts.cache_dir.clone().or_else(default_cache_dir)
}

fn open_cache(opts: &GlobalOpts) -> Result<Arc<dyn CacheStore>> {
    if opts.no_cache {
        return Ok(Arc::new(MemoryCache::new()));
    }
    match cache_dir(opts) {
        Some(dir) => {
            let cache = FileCache::open(&dir)
                .with_context(|| format!("failed to open cache at {}", dir.display()))?;
            Ok(Arc::new(cache))
        }
        None => {
            tracing::warn!("no cache directory available; caching in memory");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}
