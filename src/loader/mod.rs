//! Delegate loader binding.
//!
//! The coordinator never answers "which file defines class X" itself. It
//! fills a delegate loader with the resolved mapping and registers it with
//! the host; the delegate is what the host queries at class-resolution time.
//! When the mapping changes, a fresh delegate is built and swapped in rather
//! than mutating the registered one.

pub mod mapping;

use std::path::Path;

use crate::core::{ClassMap, NamespaceMap};
use crate::resolver::ResolvedMapping;

pub use mapping::{LoaderEvent, LoaderHost, MappingLoader, MappingLoaderFactory};

/// Class-resolution delegate capability.
pub trait DelegateLoader: Send {
    /// Add a search directory for a namespace prefix.
    fn add_namespace_mapping(&mut self, prefix: &str, path: &Path);

    /// Add explicit class to file entries. Existing entries are kept.
    fn add_class_map_entries(&mut self, entries: &ClassMap);

    /// Current namespace mappings.
    fn namespace_mappings(&self) -> NamespaceMap;

    /// Current class map.
    fn class_map(&self) -> ClassMap;

    /// Make this loader authoritative in the host.
    fn register(&mut self, prepend: bool);

    /// Withdraw this loader from the host.
    fn unregister(&mut self);
}

/// Builds delegate loaders.
pub trait LoaderFactory: Send {
    fn create(&self, base_dir: &Path) -> Box<dyn DelegateLoader>;
}

/// Build an unregistered delegate holding `mapping`.
pub fn build_loader(
    factory: &dyn LoaderFactory,
    base_dir: &Path,
    mapping: &ResolvedMapping,
) -> Box<dyn DelegateLoader> {
    let mut loader = factory.create(base_dir);
    for (prefix, paths) in &mapping.namespace_map {
        for path in paths {
            loader.add_namespace_mapping(prefix, path);
        }
    }
    if !mapping.class_map.is_empty() {
        loader.add_class_map_entries(&mapping.class_map);
    }
    loader
}
