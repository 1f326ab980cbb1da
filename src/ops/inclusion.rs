//! One-time initialization files.
//!
//! Modules list files that must run once when loaded (helper definitions,
//! global registrations). When several modules bundle the same shared
//! package, each lists its own copy. The inclusion gate groups those copies
//! by owning package, tries the highest version first, and guarantees every
//! identifier runs at most once per process.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::{Manifest, Module};
use crate::resolver::Version;
use crate::sources::PackageDetector;
use crate::util::hash::sha256_file;

/// Runs an init file.
pub trait InitExecutor: Send {
    fn execute(&mut self, identifier: &str, path: &Path) -> Result<()>;
}

/// Cross-process record of identifiers the host already ran by other means.
pub trait InclusionSentinel: Send + Sync {
    fn is_set(&self, identifier: &str) -> bool;
    fn set(&self, identifier: &str);
}

/// In-memory sentinel shared between clones.
#[derive(Debug, Clone, Default)]
pub struct SharedSentinel {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl SharedSentinel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InclusionSentinel for SharedSentinel {
    fn is_set(&self, identifier: &str) -> bool {
        self.ids
            .lock()
            .map(|ids| ids.contains(identifier))
            .unwrap_or(false)
    }

    fn set(&self, identifier: &str) {
        if let Ok(mut ids) = self.ids.lock() {
            ids.insert(identifier.to_string());
        }
    }
}

/// Executor that only records what it was asked to run.
///
/// Used by the CLI for dry runs and by tests to count executions.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    log: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything executed so far, in order.
    pub fn executed(&self) -> Vec<(String, PathBuf)> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// How many times an identifier was executed.
    pub fn count(&self, identifier: &str) -> usize {
        self.executed()
            .iter()
            .filter(|(id, _)| id == identifier)
            .count()
    }
}

impl InitExecutor for RecordingExecutor {
    fn execute(&mut self, identifier: &str, path: &Path) -> Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.push((identifier.to_string(), path.to_path_buf()));
        }
        Ok(())
    }
}

/// Executor backed by a closure.
pub struct FnExecutor<F>(pub F);

impl<F> InitExecutor for FnExecutor<F>
where
    F: FnMut(&str, &Path) -> Result<()> + Send,
{
    fn execute(&mut self, identifier: &str, path: &Path) -> Result<()> {
        (self.0)(identifier, path)
    }
}

/// One copy of an init file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitCandidate {
    pub identifier: String,
    pub path: PathBuf,
    pub version: Version,
    pub module: String,
}

/// Init files belonging to one package, highest version first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitGroup {
    pub package: String,
    pub candidates: Vec<InitCandidate>,
}

/// Group every module's init files by owning package.
///
/// Files whose package cannot be detected get a synthetic group of their own
/// (`unknown-<identifier>`) so they are never merged with anything else.
/// Groups keep first-seen order; candidates are sorted by version
/// descending, ties in module order.
pub fn group_init_files(
    manifests: &[(&Module, &Manifest)],
    detector: &mut PackageDetector,
) -> Vec<InitGroup> {
    let mut groups: Vec<InitGroup> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for (module, manifest) in manifests {
        for (identifier, path) in &manifest.init_files {
            let (package, version) = match detector.detect_owning_package(path) {
                Some(info) => (info.name, info.version),
                None => (format!("unknown-{}", identifier), Version::default()),
            };

            let slot = *slots.entry(package.clone()).or_insert_with(|| {
                groups.push(InitGroup {
                    package,
                    candidates: Vec::new(),
                });
                groups.len() - 1
            });

            groups[slot].candidates.push(InitCandidate {
                identifier: identifier.clone(),
                path: path.clone(),
                version,
                module: module.slug().to_string(),
            });
        }
    }

    for group in &mut groups {
        group.candidates.sort_by(|a, b| b.version.cmp(&a.version));
    }
    groups
}

/// Process-local record of executed init files.
#[derive(Debug, Clone, Default)]
pub struct InclusionLedger {
    included: BTreeMap<String, bool>,
    digests: HashSet<(String, String)>,
}

impl InclusionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_included(&self, identifier: &str) -> bool {
        self.included.get(identifier).copied().unwrap_or(false)
    }

    pub fn mark(&mut self, identifier: &str) {
        self.included.insert(identifier.to_string(), true);
    }

    /// Identifiers recorded so far.
    pub fn entries(&self) -> &BTreeMap<String, bool> {
        &self.included
    }

    pub fn len(&self) -> usize {
        self.included.len()
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    pub fn clear(&mut self) {
        self.included.clear();
        self.digests.clear();
    }
}

/// What a gate run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InclusionReport {
    /// Identifiers executed in this run
    pub executed: Vec<String>,
    /// Identifiers recorded without executing (sentinel or duplicate content)
    pub adopted: Vec<String>,
    /// Identifiers whose file was missing or failed
    pub skipped: Vec<String>,
}

/// Runs grouped init files against the ledger.
pub struct InclusionGate<'a> {
    ledger: &'a mut InclusionLedger,
    sentinel: &'a dyn InclusionSentinel,
    executor: &'a mut dyn InitExecutor,
}

impl<'a> InclusionGate<'a> {
    pub fn new(
        ledger: &'a mut InclusionLedger,
        sentinel: &'a dyn InclusionSentinel,
        executor: &'a mut dyn InitExecutor,
    ) -> Self {
        InclusionGate {
            ledger,
            sentinel,
            executor,
        }
    }

    /// Execute every group in order. Safe to call repeatedly.
    pub fn run(&mut self, groups: &[InitGroup]) -> InclusionReport {
        let mut report = InclusionReport::default();
        for group in groups {
            for candidate in &group.candidates {
                self.include(&group.package, candidate, &mut report);
            }
        }
        report
    }

    fn include(&mut self, package: &str, candidate: &InitCandidate, report: &mut InclusionReport) {
        let id = candidate.identifier.as_str();
        if self.ledger.is_included(id) {
            return;
        }

        if self.sentinel.is_set(id) {
            tracing::debug!("init file `{}` already run by the host", id);
            self.ledger.mark(id);
            report.adopted.push(id.to_string());
            return;
        }

        if !candidate.path.is_file() {
            tracing::debug!("init file `{}` missing at {}", id, candidate.path.display());
            report.skipped.push(id.to_string());
            return;
        }

        let digest = sha256_file(&candidate.path)
            .ok()
            .map(|d| (package.to_string(), d));
        if let Some(key) = &digest {
            if self.ledger.digests.contains(key) {
                tracing::debug!(
                    "init file `{}` duplicates an executed copy of `{}`",
                    id,
                    package
                );
                self.ledger.mark(id);
                self.sentinel.set(id);
                report.adopted.push(id.to_string());
                return;
            }
        }

        match self.executor.execute(id, &candidate.path) {
            Ok(()) => {
                tracing::debug!(
                    "ran init file `{}` from `{}` ({} {})",
                    id,
                    candidate.module,
                    package,
                    candidate.version
                );
                self.ledger.mark(id);
                self.sentinel.set(id);
                if let Some(key) = digest {
                    self.ledger.digests.insert(key);
                }
                report.executed.push(id.to_string());
            }
            Err(e) => {
                tracing::warn!(
                    "init file `{}` at {} failed: {:#}",
                    id,
                    candidate.path.display(),
                    e
                );
                report.skipped.push(id.to_string());
            }
        }
    }
}
