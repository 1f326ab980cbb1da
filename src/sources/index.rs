//! Package version index.
//!
//! Scans every registered module's shared packages directory and keeps, for
//! each package name, the instance with the highest version. Every scanned
//! instance is kept as well, so a directory inside a losing copy still maps
//! to its own package and version. The result is what the resolver consults
//! when several modules offer the same shared namespace.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::Module;
use crate::resolver::version::Version;
use crate::sources::descriptor::{parse_descriptor, scan_descriptors};
use crate::util::config::CoordinatorConfig;
use crate::util::fs::is_inside;

/// One discovered shared package instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: Version,
    /// Slug of the module bundling this copy
    pub owner: String,
    /// Dependency root of the owning module
    pub dependency_root: PathBuf,
    /// Directory of this package copy
    pub package_dir: PathBuf,
}

/// Package name to its highest-version instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIndex {
    packages: BTreeMap<String, PackageDescriptor>,
    /// Every instance offered, winners and losers, in scan order
    #[serde(default)]
    instances: Vec<PackageDescriptor>,
}

impl PackageIndex {
    /// Build the index by scanning each module in order.
    ///
    /// A later instance replaces an earlier one only with a strictly higher
    /// version, so equal versions keep the first module seen.
    pub fn build(modules: &[Module], config: &CoordinatorConfig) -> Self {
        let mut index = PackageIndex::default();

        for module in modules {
            let found = scan_descriptors(
                module.packages_dir(),
                &config.descriptor_file,
                &config.asset_subdir,
            );

            for descriptor in found {
                let Some(info) = parse_descriptor(&descriptor.path) else {
                    continue;
                };

                index.offer(PackageDescriptor {
                    name: info.name,
                    version: info.version,
                    owner: module.slug().to_string(),
                    dependency_root: module.dependency_root().to_path_buf(),
                    package_dir: descriptor.package_dir,
                });
            }
        }

        tracing::debug!(
            "indexed {} shared packages across {} modules",
            index.len(),
            modules.len()
        );
        index
    }

    /// Record an instance and make it the winner for its name unless an
    /// equal or higher version is present. Returns whether it won.
    pub fn offer(&mut self, descriptor: PackageDescriptor) -> bool {
        self.instances.push(descriptor.clone());
        if let Some(existing) = self.packages.get(&descriptor.name) {
            if descriptor.version <= existing.version {
                return false;
            }
            tracing::debug!(
                "`{}` {} from `{}` supersedes {} from `{}`",
                descriptor.name,
                descriptor.version,
                descriptor.owner,
                existing.version,
                existing.owner
            );
        }
        self.packages.insert(descriptor.name.clone(), descriptor);
        true
    }

    pub fn get(&self, name: &str) -> Option<&PackageDescriptor> {
        self.packages.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Every scanned instance, including copies that lost to a higher version.
    pub fn instances(&self) -> &[PackageDescriptor] {
        &self.instances
    }

    /// The scanned instance whose package directory contains `path`.
    ///
    /// Losing copies are found too. With nested package directories the
    /// innermost one wins. Directories outside every package map to nothing.
    pub fn instance_for_path(&self, path: &Path) -> Option<&PackageDescriptor> {
        self.instances
            .iter()
            .filter(|d| is_inside(path, &d.package_dir))
            .max_by_key(|d| d.package_dir.components().count())
    }
}
