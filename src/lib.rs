//! Autoload coordinator - conflict resolution for shared module dependencies
//!
//! Independently distributed modules often bundle the same shared packages,
//! each with its own generated autoload manifest. This crate merges those
//! manifests into one authoritative class-loading mapping: it picks the
//! highest available version of every shared package (or the preferred
//! module's copy), binds a single delegate loader, and makes sure each
//! one-time initialization file runs at most once.

pub mod core;
pub mod loader;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities for coordinator unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides builders for on-disk module trees.
#[cfg(test)]
pub mod test_support;

pub use core::{Manifest, Module, ModuleConfig, Registry};
pub use loader::{DelegateLoader, LoaderFactory, LoaderHost, MappingLoaderFactory};
pub use ops::{Coordinator, CoordinatorStats, HostEvent};
pub use resolver::{Resolution, ResolvedMapping, Version};
pub use sources::{CacheStore, FileCache, MemoryCache, PackageIndex};
pub use util::config::{CoordinatorConfig, HostConfig};
