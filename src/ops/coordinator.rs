//! The coordinator.
//!
//! Owns the registry, the inclusion ledger and the bound delegate loader for
//! one process. The host's composition root creates one coordinator, feeds it
//! module registrations and lifecycle events, and calls [`Coordinator::bootstrap`]
//! once modules are known.
//!
//! Flow:
//! 1. The first module in merge order is bound immediately, so its classes
//!    resolve even if coordination never completes.
//! 2. With two or more modules, every manifest is loaded, the package index
//!    is built (or read from the shared cache), shared prefixes are
//!    arbitrated, and a fresh delegate replaces the first one.
//! 3. Init files run through the inclusion gate.
//!
//! Nothing here fails: broken artifacts degrade to empty input.

use std::sync::Arc;

use serde::Serialize;

use crate::core::{Manifest, ManifestReader, Module, ModuleConfig, Registry};
use crate::loader::{build_loader, DelegateLoader, LoaderFactory, MappingLoaderFactory};
use crate::ops::hooks::HostEvent;
use crate::ops::inclusion::{
    group_init_files, InclusionGate, InclusionLedger, InclusionReport, InclusionSentinel,
    InitExecutor, InitGroup, RecordingExecutor, SharedSentinel,
};
use crate::resolver::{resolve, Resolution, ResolvedMapping};
use crate::sources::cache::{get_json, set_json};
use crate::sources::{
    cache_key, CacheStore, MemoryCache, PackageDetector, PackageIndex, FILE_GROUPS_KEY,
    PACKAGE_INDEX_KEY,
};
use crate::util::config::CoordinatorConfig;

/// Counters exposed for inspection and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Package index builds that walked the filesystem
    pub index_scans: usize,
    /// Init-file groupings computed from manifests
    pub group_builds: usize,
    /// Delegate loaders registered with the host
    pub delegate_binds: usize,
    /// Conflict resolutions computed
    pub resolutions: usize,
    /// Init files executed
    pub executions: usize,
}

/// A value derived from a specific registry generation.
#[derive(Debug)]
struct Memo<T> {
    generation: u64,
    value: T,
}

/// Process-wide autoload coordinator.
pub struct Coordinator {
    config: CoordinatorConfig,
    registry: Registry,
    preferred: Option<String>,
    bootstrapped: bool,

    reader: ManifestReader,
    detector: PackageDetector,
    index: Option<Memo<PackageIndex>>,
    groups: Option<Memo<Vec<InitGroup>>>,
    resolved: Option<Memo<(ResolvedMapping, Vec<Resolution>)>>,

    cache: Arc<dyn CacheStore>,
    factory: Box<dyn LoaderFactory>,
    delegate: Option<Box<dyn DelegateLoader>>,
    /// Registry generation the bound delegate was built from
    bound_generation: Option<u64>,
    executor: Box<dyn InitExecutor>,
    sentinel: Arc<dyn InclusionSentinel>,
    ledger: InclusionLedger,
    last_inclusion: InclusionReport,

    stats: CoordinatorStats,
}

impl Coordinator {
    /// Create a coordinator with process-local collaborators.
    ///
    /// Hosts replace them with the `with_*` methods.
    pub fn new(config: CoordinatorConfig) -> Self {
        Coordinator {
            reader: ManifestReader::new(config.manifest_dir.clone()),
            detector: PackageDetector::new(config.descriptor_file.clone(), config.detect_depth),
            config,
            registry: Registry::new(),
            preferred: None,
            bootstrapped: false,
            index: None,
            groups: None,
            resolved: None,
            cache: Arc::new(MemoryCache::new()),
            factory: Box::new(MappingLoaderFactory::default()),
            delegate: None,
            bound_generation: None,
            executor: Box::new(RecordingExecutor::new()),
            sentinel: Arc::new(SharedSentinel::new()),
            ledger: InclusionLedger::new(),
            last_inclusion: InclusionReport::default(),
            stats: CoordinatorStats::default(),
        }
    }

    /// Use a shared persistent cache.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    /// Use a different delegate loader implementation.
    pub fn with_loader_factory(mut self, factory: impl LoaderFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Use a different init-file executor.
    pub fn with_executor(mut self, executor: impl InitExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    /// Use the host's cross-process inclusion sentinel.
    pub fn with_sentinel(mut self, sentinel: Arc<dyn InclusionSentinel>) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Register (or re-register) a module.
    pub fn register(&mut self, module: ModuleConfig) {
        self.registry.register(module, &self.config);
    }

    /// React to a host lifecycle event.
    pub fn on_host_event(&mut self, event: HostEvent) {
        tracing::debug!("host event: {:?}", event);
        match event {
            HostEvent::ModuleRegistered(module) => self.register(module),
            other if other.invalidates_cache() => self.invalidate_cache(),
            _ => {}
        }
    }

    /// Bind autoloading for the registered modules.
    pub fn bootstrap(&mut self) {
        self.bootstrap_with(|_| {});
    }

    /// Bind autoloading, then run `callback`.
    ///
    /// Does nothing when already bootstrapped or when no module is
    /// registered. A single module is bound directly without coordination.
    pub fn bootstrap_with(&mut self, callback: impl FnOnce(&Coordinator)) {
        if self.bootstrapped {
            return;
        }
        if self.registry.is_empty() {
            tracing::debug!("no modules registered; nothing to bootstrap");
            return;
        }
        self.bootstrapped = true;

        self.ensure_preferred();
        self.bind_first();

        if self.registry.len() >= 2 {
            self.coordinate();
        }

        callback(self);
    }

    /// Resolve shared prefixes and run init files.
    ///
    /// Callable without [`Coordinator::bootstrap`]. With fewer than two
    /// modules it only makes sure the single module is bound, rebinding when
    /// the module was re-registered. Repeated calls with an unchanged
    /// registry reuse the previous resolution and execute nothing new.
    pub fn coordinate(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        let single = self.registry.len() < 2;
        if self.delegate.is_none()
            || (single && self.bound_generation != Some(self.registry.generation()))
        {
            self.bind_first();
        }

        if single {
            tracing::debug!("single module registered; skipping coordination");
            return;
        }

        let order = self.merge_order();
        let manifests: Vec<(Module, Arc<Manifest>)> = order
            .iter()
            .map(|m| (m.clone(), self.reader.load(m)))
            .collect();
        let pairs: Vec<(&Module, &Manifest)> =
            manifests.iter().map(|(m, mf)| (m, mf.as_ref())).collect();

        self.ensure_index(&order);
        self.ensure_resolution(&pairs);
        self.include_files(&pairs);
    }

    /// Drop persisted and memoized package information.
    ///
    /// The next [`Coordinator::coordinate`] rescans the filesystem.
    pub fn invalidate_cache(&mut self) {
        let fingerprint = self.registry.fingerprint();
        self.cache.delete(&cache_key(PACKAGE_INDEX_KEY, &fingerprint));
        self.cache.delete(&cache_key(FILE_GROUPS_KEY, &fingerprint));

        self.index = None;
        self.groups = None;
        self.resolved = None;
        self.detector.clear();
        tracing::debug!("invalidated package caches for module set {}", fingerprint);
    }

    /// The delegate currently registered with the host.
    pub fn delegate_loader(&self) -> Option<&dyn DelegateLoader> {
        self.delegate.as_deref()
    }

    /// Return to a fresh, unregistered state.
    ///
    /// Unregisters the bound delegate. Collaborators (cache, factory,
    /// executor, sentinel) are kept; the shared cache is not touched.
    pub fn reset(&mut self) {
        if let Some(mut delegate) = self.delegate.take() {
            delegate.unregister();
        }
        self.bound_generation = None;
        self.registry = Registry::new();
        self.preferred = None;
        self.bootstrapped = false;
        self.reader.clear();
        self.detector.clear();
        self.index = None;
        self.groups = None;
        self.resolved = None;
        self.ledger.clear();
        self.last_inclusion = InclusionReport::default();
        self.stats = CoordinatorStats::default();
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// The preferred-module reference, fixed by [`Coordinator::bootstrap`].
    pub fn preferred_reference(&self) -> Option<&str> {
        self.preferred.as_deref()
    }

    /// Modules in merge order.
    pub fn merge_order(&self) -> Vec<Module> {
        self.registry.order(Some(&self.preferred_slug()))
    }

    /// The package index used by the last coordination.
    pub fn package_index(&self) -> Option<&PackageIndex> {
        self.index.as_ref().map(|m| &m.value)
    }

    /// The mapping produced by the last conflict resolution.
    pub fn resolved_mapping(&self) -> Option<&ResolvedMapping> {
        self.resolved.as_ref().map(|m| &m.value.0)
    }

    /// Shared-prefix decisions of the last conflict resolution.
    pub fn resolutions(&self) -> &[Resolution] {
        self.resolved
            .as_ref()
            .map(|m| m.value.1.as_slice())
            .unwrap_or(&[])
    }

    /// The mapping held by the bound delegate.
    pub fn bound_mapping(&self) -> Option<ResolvedMapping> {
        self.delegate.as_ref().map(|d| ResolvedMapping {
            namespace_map: d.namespace_mappings(),
            class_map: d.class_map(),
        })
    }

    /// Init files grouped by owning package, once computed.
    pub fn init_groups(&self) -> Option<&[InitGroup]> {
        self.groups.as_ref().map(|m| m.value.as_slice())
    }

    pub fn ledger(&self) -> &InclusionLedger {
        &self.ledger
    }

    /// What the most recent inclusion run did.
    pub fn last_inclusion(&self) -> &InclusionReport {
        &self.last_inclusion
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    /// Manifest artifact reads so far.
    pub fn manifest_reads(&self) -> usize {
        self.reader.reads()
    }

    fn ensure_preferred(&mut self) {
        if self.preferred.is_none() {
            let preferred = self
                .registry
                .preferred_reference(self.config.preferred.as_deref());
            tracing::debug!("preferred module: `{}`", preferred);
            self.preferred = Some(preferred);
        }
    }

    /// The fixed reference after bootstrap, else one derived from the
    /// current registry.
    fn preferred_slug(&self) -> String {
        self.preferred
            .clone()
            .unwrap_or_else(|| self.registry.preferred_reference(self.config.preferred.as_deref()))
    }

    fn preferred_module(&self) -> Option<&Module> {
        self.registry.get(&self.preferred_slug())
    }

    /// Bind the first module's manifest as-is.
    fn bind_first(&mut self) {
        let Some(first) = self.merge_order().into_iter().next() else {
            return;
        };
        let manifest = self.reader.load(&first);
        let mapping = ResolvedMapping::from_manifest(&manifest);
        tracing::debug!("binding `{}` directly", first.slug());
        self.swap_delegate(&first, &mapping);
    }

    /// Replace the bound delegate with a fresh one holding `mapping`.
    ///
    /// The old delegate is unregistered before the new one registers, so at
    /// most one is authoritative at any time.
    fn swap_delegate(&mut self, base: &Module, mapping: &ResolvedMapping) {
        let mut loader = build_loader(self.factory.as_ref(), base.dependency_root(), mapping);
        if let Some(mut old) = self.delegate.take() {
            old.unregister();
        }
        loader.register(true);
        self.delegate = Some(loader);
        self.bound_generation = Some(self.registry.generation());
        self.stats.delegate_binds += 1;
    }

    fn ensure_index(&mut self, order: &[Module]) {
        let generation = self.registry.generation();
        if self.index.as_ref().is_some_and(|m| m.generation == generation) {
            return;
        }

        let key = cache_key(PACKAGE_INDEX_KEY, &self.registry.fingerprint());
        let index = match get_json::<PackageIndex>(self.cache.as_ref(), &key) {
            Some(index) => {
                tracing::debug!("package index served from cache");
                index
            }
            None => {
                let index = PackageIndex::build(order, &self.config);
                self.stats.index_scans += 1;
                set_json(self.cache.as_ref(), &key, &index, self.config.cache_ttl());
                index
            }
        };

        self.index = Some(Memo {
            generation,
            value: index,
        });
        // A new index can change every decision.
        self.resolved = None;
    }

    fn ensure_resolution(&mut self, manifests: &[(&Module, &Manifest)]) {
        let generation = self.registry.generation();
        if self.resolved.as_ref().is_some_and(|m| m.generation == generation) {
            return;
        }

        let empty = PackageIndex::default();
        let index = self.package_index().unwrap_or(&empty);
        let (mapping, resolutions) =
            resolve(manifests, index, self.preferred_module(), &self.config);
        self.stats.resolutions += 1;

        let Some((base, _)) = manifests.first() else {
            return;
        };
        let base = (*base).clone();
        self.swap_delegate(&base, &mapping);
        self.resolved = Some(Memo {
            generation,
            value: (mapping, resolutions),
        });
    }

    fn include_files(&mut self, manifests: &[(&Module, &Manifest)]) {
        let generation = self.registry.generation();
        if !self.groups.as_ref().is_some_and(|m| m.generation == generation) {
            let key = cache_key(FILE_GROUPS_KEY, &self.registry.fingerprint());
            let groups = match get_json::<Vec<InitGroup>>(self.cache.as_ref(), &key) {
                Some(groups) => groups,
                None => {
                    let groups = group_init_files(manifests, &mut self.detector);
                    self.stats.group_builds += 1;
                    set_json(self.cache.as_ref(), &key, &groups, self.config.cache_ttl());
                    groups
                }
            };
            self.groups = Some(Memo {
                generation,
                value: groups,
            });
        }

        let Some(groups) = self.groups.as_ref() else {
            return;
        };
        let report = InclusionGate::new(
            &mut self.ledger,
            self.sentinel.as_ref(),
            self.executor.as_mut(),
        )
        .run(&groups.value);

        self.stats.executions += report.executed.len();
        self.last_inclusion = report;
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Coordinator::new(CoordinatorConfig::default())
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("modules", &self.registry.len())
            .field("preferred", &self.preferred)
            .field("bootstrapped", &self.bootstrapped)
            .field("bound", &self.delegate.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}
