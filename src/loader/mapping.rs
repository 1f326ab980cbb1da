//! In-process delegate loader.
//!
//! `MappingLoader` stores namespace and class mappings; `LoaderHost` is the
//! shared registration point the loaders register with. The host keeps the
//! stack of registered loaders, records every register/unregister, and
//! answers class lookups by asking registered loaders in stack order.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::core::{ClassMap, NamespaceMap};
use crate::loader::{DelegateLoader, LoaderFactory};

/// Default extension of class files resolved through namespace mappings.
pub const DEFAULT_EXTENSION: &str = "inc";

/// Identity of a loader within a host.
pub type LoaderId = u64;

/// A registration change observed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderEvent {
    Registered { id: LoaderId, prepend: bool },
    Unregistered { id: LoaderId },
}

#[derive(Debug, Default)]
struct Mappings {
    namespaces: NamespaceMap,
    classes: ClassMap,
}

impl Mappings {
    fn find_file(&self, class: &str, extension: &str) -> Option<PathBuf> {
        let class = class.trim_start_matches('\\');
        if let Some(path) = self.classes.get(class) {
            return Some(path.clone());
        }

        // Longest matching prefix first.
        let mut prefixes: Vec<_> = self
            .namespaces
            .iter()
            .filter(|(prefix, _)| class.starts_with(prefix.as_str()))
            .collect();
        prefixes.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));

        for (prefix, dirs) in prefixes {
            let relative = class[prefix.len()..].replace('\\', "/");
            for dir in dirs {
                let candidate = dir.join(format!("{}.{}", relative, extension));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

#[derive(Debug, Default)]
struct HostState {
    next_id: LoaderId,
    stack: Vec<(LoaderId, Arc<RwLock<Mappings>>)>,
    events: Vec<LoaderEvent>,
}

/// Shared registration point for delegate loaders.
#[derive(Debug, Clone)]
pub struct LoaderHost {
    state: Arc<Mutex<HostState>>,
    extension: Arc<str>,
}

impl LoaderHost {
    pub fn new() -> Self {
        Self::with_extension(DEFAULT_EXTENSION)
    }

    /// A host resolving namespace mappings to files with `extension`.
    pub fn with_extension(extension: &str) -> Self {
        LoaderHost {
            state: Arc::default(),
            extension: Arc::from(extension),
        }
    }

    fn allocate_id(&self) -> LoaderId {
        let mut state = self.lock();
        state.next_id += 1;
        state.next_id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostState> {
        // A poisoned host only means a panicking test thread; keep serving.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, id: LoaderId, mappings: Arc<RwLock<Mappings>>, prepend: bool) {
        let mut state = self.lock();
        state.stack.retain(|(existing, _)| *existing != id);
        if prepend {
            state.stack.insert(0, (id, mappings));
        } else {
            state.stack.push((id, mappings));
        }
        state.events.push(LoaderEvent::Registered { id, prepend });
    }

    fn remove(&self, id: LoaderId) {
        let mut state = self.lock();
        let before = state.stack.len();
        state.stack.retain(|(existing, _)| *existing != id);
        if state.stack.len() != before {
            state.events.push(LoaderEvent::Unregistered { id });
        }
    }

    /// Resolve a class to a file through the registered loaders.
    pub fn find_file(&self, class: &str) -> Option<PathBuf> {
        let stack: Vec<_> = self.lock().stack.iter().map(|(_, m)| Arc::clone(m)).collect();
        stack.iter().find_map(|mappings| {
            mappings
                .read()
                .ok()
                .and_then(|m| m.find_file(class, &self.extension))
        })
    }

    /// Number of currently registered loaders.
    pub fn registered_count(&self) -> usize {
        self.lock().stack.len()
    }

    /// Ids of registered loaders, in lookup order.
    pub fn registered_ids(&self) -> Vec<LoaderId> {
        self.lock().stack.iter().map(|(id, _)| *id).collect()
    }

    /// Every registration change so far.
    pub fn events(&self) -> Vec<LoaderEvent> {
        self.lock().events.clone()
    }
}

impl Default for LoaderHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Delegate loader backed by in-memory mappings.
#[derive(Debug)]
pub struct MappingLoader {
    id: LoaderId,
    base_dir: PathBuf,
    host: LoaderHost,
    mappings: Arc<RwLock<Mappings>>,
    registered: bool,
}

impl MappingLoader {
    pub fn new(base_dir: &Path, host: LoaderHost) -> Self {
        MappingLoader {
            id: host.allocate_id(),
            base_dir: base_dir.to_path_buf(),
            host,
            mappings: Arc::default(),
            registered: false,
        }
    }

    pub fn id(&self) -> LoaderId {
        self.id
    }
}

impl DelegateLoader for MappingLoader {
    fn add_namespace_mapping(&mut self, prefix: &str, path: &Path) {
        if let Ok(mut m) = self.mappings.write() {
            let dirs = m.namespaces.entry(prefix.to_string()).or_default();
            if !dirs.iter().any(|d| d == path) {
                dirs.push(path.to_path_buf());
            }
        }
    }

    fn add_class_map_entries(&mut self, entries: &ClassMap) {
        if let Ok(mut m) = self.mappings.write() {
            for (class, path) in entries {
                m.classes.entry(class.clone()).or_insert_with(|| path.clone());
            }
        }
    }

    fn namespace_mappings(&self) -> NamespaceMap {
        self.mappings
            .read()
            .map(|m| m.namespaces.clone())
            .unwrap_or_default()
    }

    fn class_map(&self) -> ClassMap {
        self.mappings
            .read()
            .map(|m| m.classes.clone())
            .unwrap_or_default()
    }

    fn register(&mut self, prepend: bool) {
        self.host.push(self.id, Arc::clone(&self.mappings), prepend);
        self.registered = true;
        tracing::debug!(
            "registered loader {} for {} (prepend: {})",
            self.id,
            self.base_dir.display(),
            prepend
        );
    }

    fn unregister(&mut self) {
        if self.registered {
            self.host.remove(self.id);
            self.registered = false;
        }
    }
}

/// Creates [`MappingLoader`]s attached to one host.
#[derive(Debug, Clone, Default)]
pub struct MappingLoaderFactory {
    host: LoaderHost,
}

impl MappingLoaderFactory {
    pub fn new(host: LoaderHost) -> Self {
        MappingLoaderFactory { host }
    }

    pub fn host(&self) -> &LoaderHost {
        &self.host
    }
}

impl LoaderFactory for MappingLoaderFactory {
    fn create(&self, base_dir: &Path) -> Box<dyn DelegateLoader> {
        Box::new(MappingLoader::new(base_dir, self.host.clone()))
    }
}
