//! Merging module manifests into one resolved mapping.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::{ClassMap, Manifest, Module, NamespaceMap};
use crate::sources::{PackageDescriptor, PackageIndex};
use crate::util::config::CoordinatorConfig;
use crate::util::fs::is_inside;

/// The merged mapping bound to the delegate loader.
///
/// Shared-namespace prefixes hold exactly one directory; every other prefix
/// keeps all contributing directories in module merge order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedMapping {
    pub namespace_map: NamespaceMap,
    pub class_map: ClassMap,
}

impl ResolvedMapping {
    /// A single module's manifest, bound as-is.
    pub fn from_manifest(manifest: &Manifest) -> Self {
        ResolvedMapping {
            namespace_map: manifest.namespace_map.clone(),
            class_map: manifest.class_map.clone(),
        }
    }
}

/// Why a shared prefix ended up with the directory it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Reason {
    /// Only one module offered the prefix
    SingleCandidate,
    /// The directory belongs to the preferred module
    Preferred { module: String },
    /// The directory carries the highest package version
    HighestVersion { package: String, version: String },
    /// No version decided; the first candidate was kept
    FirstCandidate,
}

/// The outcome for one shared prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub prefix: String,
    pub candidates: Vec<PathBuf>,
    pub chosen: PathBuf,
    pub reason: Reason,
}

/// Merge manifests (given in module merge order) and arbitrate shared
/// prefixes.
///
/// `preferred` is the preferred module, if it is registered.
pub fn resolve(
    manifests: &[(&Module, &Manifest)],
    index: &PackageIndex,
    preferred: Option<&Module>,
    config: &CoordinatorConfig,
) -> (ResolvedMapping, Vec<Resolution>) {
    let mut merged = NamespaceMap::new();
    for (_, manifest) in manifests {
        for (prefix, paths) in &manifest.namespace_map {
            let slot = merged.entry(prefix.clone()).or_default();
            for path in paths {
                if !slot.contains(path) {
                    slot.push(path.clone());
                }
            }
        }
    }

    let mut resolutions = Vec::new();
    let mut namespace_map = NamespaceMap::new();
    for (prefix, candidates) in merged {
        if !config.is_shared_prefix(&prefix) || candidates.is_empty() {
            namespace_map.insert(prefix, candidates);
            continue;
        }

        let (chosen, reason) = select_path(&candidates, index, preferred);
        tracing::debug!("`{}` -> {} ({:?})", prefix, chosen.display(), reason);
        namespace_map.insert(prefix.clone(), vec![chosen.clone()]);
        resolutions.push(Resolution {
            prefix,
            candidates,
            chosen,
            reason,
        });
    }

    // First registration of a class wins.
    let mut class_map = ClassMap::new();
    for (_, manifest) in manifests {
        for (class, path) in &manifest.class_map {
            class_map
                .entry(class.clone())
                .or_insert_with(|| path.clone());
        }
    }

    (
        ResolvedMapping {
            namespace_map,
            class_map,
        },
        resolutions,
    )
}

/// Pick one directory among the candidates of a shared prefix.
pub fn select_path(
    candidates: &[PathBuf],
    index: &PackageIndex,
    preferred: Option<&Module>,
) -> (PathBuf, Reason) {
    if let [only] = candidates {
        return (only.clone(), Reason::SingleCandidate);
    }

    if let Some(module) = preferred {
        if let Some(path) = candidates.iter().find(|p| is_inside(p, module.root_dir())) {
            return (
                path.clone(),
                Reason::Preferred {
                    module: module.slug().to_string(),
                },
            );
        }
    }

    // Each candidate is ranked by its own package copy. Only copies of the
    // package the first identified candidate belongs to compete; candidates
    // outside that package rank below them.
    let owned: Vec<(&PathBuf, Option<&PackageDescriptor>)> = candidates
        .iter()
        .map(|path| (path, index.instance_for_path(path)))
        .collect();
    let package = owned
        .iter()
        .find_map(|&(_, descriptor)| descriptor.map(|d| d.name.as_str()));

    let mut best: Option<(&PathBuf, &PackageDescriptor)> = None;
    for &(path, descriptor) in &owned {
        let Some(descriptor) = descriptor.filter(|d| Some(d.name.as_str()) == package) else {
            continue;
        };
        match best {
            Some((_, current)) if descriptor.version <= current.version => {}
            _ => best = Some((path, descriptor)),
        }
    }

    match best {
        Some((path, descriptor)) => (
            path.clone(),
            Reason::HighestVersion {
                package: descriptor.name.clone(),
                version: descriptor.version.to_string(),
            },
        ),
        None => (first(candidates), Reason::FirstCandidate),
    }
}

fn first(candidates: &[PathBuf]) -> PathBuf {
    candidates
        .first()
        .cloned()
        .unwrap_or_else(|| Path::new("").to_path_buf())
}
