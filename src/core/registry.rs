//! Module registry.
//!
//! Holds the set of registered modules keyed by slug and orders them for
//! merging. Every mutation bumps a generation counter so that anything
//! derived from the module set (manifests, package index, resolved mapping)
//! can be recognised as stale.

use crate::core::module::{Module, ModuleConfig};
use crate::util::config::CoordinatorConfig;
use crate::util::hash::Fingerprint;

/// Slug used as the preferred module when neither an override nor a default
/// module exists.
pub const FALLBACK_PREFERRED: &str = "core";

/// Registered modules in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    modules: Vec<Module>,
    generation: u64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a module.
    ///
    /// Re-registering a slug overwrites its entry in place, keeping the
    /// original insertion slot. Returns the previous entry, if any.
    pub fn register(&mut self, config: ModuleConfig, layout: &CoordinatorConfig) -> Option<Module> {
        let module = Module::from_config(config, layout);
        self.generation += 1;

        match self.modules.iter_mut().find(|m| m.slug() == module.slug()) {
            Some(existing) => {
                tracing::debug!("re-registering module `{}`", module.slug());
                Some(std::mem::replace(existing, module))
            }
            None => {
                tracing::debug!(
                    "registered module `{}` at {}",
                    module.slug(),
                    module.root_dir().display()
                );
                self.modules.push(module);
                None
            }
        }
    }

    /// Look up a module by slug.
    pub fn get(&self, slug: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.slug() == slug)
    }

    /// Modules in insertion order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Monotonic counter bumped on every mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Modules in merge order: the preferred module first, then ascending
    /// priority with ties kept in insertion order.
    pub fn order(&self, preferred: Option<&str>) -> Vec<Module> {
        let mut ordered = self.modules.clone();
        ordered.sort_by_key(|m| (Some(m.slug()) != preferred, m.priority()));
        ordered
    }

    /// Resolve the preferred-module reference.
    ///
    /// An explicit override wins, then the first module flagged as default,
    /// then [`FALLBACK_PREFERRED`].
    pub fn preferred_reference(&self, explicit: Option<&str>) -> String {
        if let Some(slug) = explicit.filter(|s| !s.is_empty()) {
            return slug.to_string();
        }
        self.modules
            .iter()
            .find(|m| m.is_default())
            .map(|m| m.slug().to_string())
            .unwrap_or_else(|| FALLBACK_PREFERRED.to_string())
    }

    /// Stable fingerprint of the module set, independent of insertion order.
    pub fn fingerprint(&self) -> String {
        let mut entries: Vec<_> = self
            .modules
            .iter()
            .map(|m| (m.slug(), m.dependency_root()))
            .collect();
        entries.sort();

        let mut fp = Fingerprint::new();
        for (slug, dep_root) in entries {
            fp.update_str(slug).update_path(dep_root);
        }
        fp.finish_short()
    }
}
