//! Generated autoload manifests.
//!
//! Each module's build step writes three artifacts under
//! `<dependency_root>/<manifest_dir>/`:
//!
//! - `namespaces.json`: namespace prefix to a directory or list of directories
//! - `classmap.json`: fully qualified class name to file
//! - `files.json`: init-file identifier to file
//!
//! Relative paths inside the artifacts are relative to the dependency root.
//! Any artifact may be absent or broken; it then reads as empty so that one
//! bad module cannot block class resolution for the others.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::core::module::Module;
use crate::util::fs::{read_json, resolve_against, ArtifactError};

/// Namespace artifact file name.
pub const NAMESPACES_FILE: &str = "namespaces.json";

/// Class map artifact file name.
pub const CLASSMAP_FILE: &str = "classmap.json";

/// Init-file list artifact file name.
pub const FILES_FILE: &str = "files.json";

/// Namespace prefix to ordered search directories.
pub type NamespaceMap = BTreeMap<String, Vec<PathBuf>>;

/// Class name to file.
pub type ClassMap = BTreeMap<String, PathBuf>;

/// Init-file identifier to file.
pub type InitFiles = BTreeMap<String, PathBuf>;

/// One module's autoload manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub namespace_map: NamespaceMap,
    pub class_map: ClassMap,
    pub init_files: InitFiles,
}

impl Manifest {
    /// Read a module's artifacts. Never fails.
    pub fn read(dependency_root: &Path, manifest_dir: &str) -> Self {
        let dir = dependency_root.join(manifest_dir);

        let namespace_map = soft_read::<BTreeMap<String, PathList>>(&dir.join(NAMESPACES_FILE))
            .into_iter()
            .map(|(prefix, paths)| {
                let paths = paths
                    .into_vec()
                    .iter()
                    .map(|p| resolve_against(dependency_root, p))
                    .collect();
                (prefix, paths)
            })
            .collect();

        let class_map = resolve_all(
            dependency_root,
            soft_read::<BTreeMap<String, PathBuf>>(&dir.join(CLASSMAP_FILE)),
        );
        let init_files = resolve_all(
            dependency_root,
            soft_read::<BTreeMap<String, PathBuf>>(&dir.join(FILES_FILE)),
        );

        Manifest {
            namespace_map,
            class_map,
            init_files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespace_map.is_empty() && self.class_map.is_empty() && self.init_files.is_empty()
    }
}

/// A namespace entry may list one directory or several.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PathList {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl PathList {
    fn into_vec(self) -> Vec<PathBuf> {
        match self {
            PathList::One(p) => vec![p],
            PathList::Many(v) => v,
        }
    }
}

fn resolve_all(base: &Path, map: BTreeMap<String, PathBuf>) -> BTreeMap<String, PathBuf> {
    map.into_iter()
        .map(|(k, p)| (k, resolve_against(base, &p)))
        .collect()
}

fn soft_read<T>(path: &Path) -> T
where
    T: Default + serde::de::DeserializeOwned,
{
    match read_json(path) {
        Ok(value) => value,
        Err(e) if e.is_missing() => T::default(),
        Err(e @ ArtifactError::Unreadable { .. }) => {
            tracing::warn!("{}", e);
            T::default()
        }
        Err(e) => {
            tracing::warn!("{}; treating as empty", e);
            T::default()
        }
    }
}

/// Per-process memo of module manifests.
///
/// A manifest is read once per module and only re-read when the module's
/// registry entry changed.
#[derive(Debug, Default)]
pub struct ManifestReader {
    manifest_dir: String,
    memo: HashMap<String, (Module, Arc<Manifest>)>,
    reads: usize,
}

impl ManifestReader {
    /// Create a reader for artifacts stored under `manifest_dir`.
    pub fn new(manifest_dir: impl Into<String>) -> Self {
        ManifestReader {
            manifest_dir: manifest_dir.into(),
            memo: HashMap::new(),
            reads: 0,
        }
    }

    /// Load a module's manifest, reading from disk only on first use.
    pub fn load(&mut self, module: &Module) -> Arc<Manifest> {
        if let Some((seen, manifest)) = self.memo.get(module.slug()) {
            if seen == module {
                return Arc::clone(manifest);
            }
        }

        let manifest = Arc::new(Manifest::read(module.dependency_root(), &self.manifest_dir));
        self.reads += 1;
        tracing::debug!(
            "loaded manifest for `{}`: {} prefixes, {} classes, {} init files",
            module.slug(),
            manifest.namespace_map.len(),
            manifest.class_map.len(),
            manifest.init_files.len()
        );

        self.memo
            .insert(module.slug().to_string(), (module.clone(), Arc::clone(&manifest)));
        manifest
    }

    /// Memoized manifest for a slug, if already loaded.
    pub fn cached(&self, slug: &str) -> Option<Arc<Manifest>> {
        self.memo.get(slug).map(|(_, m)| Arc::clone(m))
    }

    /// Number of times artifacts were read from disk.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.memo.clear();
        self.reads = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ModuleConfig;
    use crate::util::config::CoordinatorConfig;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn module(root: &Path) -> Module {
        Module::from_config(ModuleConfig::new("alpha", root), &CoordinatorConfig::default())
    }

    #[test]
    fn test_read_all_artifacts() {
        let tmp = TempDir::new().unwrap();
        let dep_root = tmp.path().join("vendor");
        let dir = dep_root.join("autoload");
        write(
            &dir.join(NAMESPACES_FILE),
            r#"{"Shared\\Log\\": ["shared/log/src"], "Alpha\\": "../src"}"#,
        );
        write(
            &dir.join(CLASSMAP_FILE),
            r#"{"Alpha\\Legacy": "../legacy/Legacy.inc"}"#,
        );
        write(&dir.join(FILES_FILE), r#"{"a1b2": "shared/log/bootstrap.inc"}"#);

        let manifest = Manifest::read(&dep_root, "autoload");

        assert_eq!(
            manifest.namespace_map["Shared\\Log\\"],
            vec![dep_root.join("shared/log/src")]
        );
        assert_eq!(manifest.namespace_map["Alpha\\"], vec![tmp.path().join("src")]);
        assert_eq!(
            manifest.class_map["Alpha\\Legacy"],
            tmp.path().join("legacy/Legacy.inc")
        );
        assert_eq!(
            manifest.init_files["a1b2"],
            dep_root.join("shared/log/bootstrap.inc")
        );
    }

    #[test]
    fn test_missing_artifacts_are_empty() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::read(tmp.path(), "autoload");
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_malformed_artifact_only_empties_itself() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("autoload");
        write(&dir.join(NAMESPACES_FILE), "[1, 2");
        write(&dir.join(CLASSMAP_FILE), r#"{"A\\B": "b.inc"}"#);
        write(&dir.join(FILES_FILE), r#"["not", "a", "map"]"#);

        let manifest = Manifest::read(tmp.path(), "autoload");
        assert!(manifest.namespace_map.is_empty());
        assert_eq!(manifest.class_map.len(), 1);
        assert!(manifest.init_files.is_empty());
    }

    #[test]
    fn test_reader_memoizes_until_entry_changes() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp.path().join("vendor/autoload").join(CLASSMAP_FILE),
            r#"{"A\\B": "b.inc"}"#,
        );

        let mut reader = ManifestReader::new("autoload");
        let m = module(tmp.path());
        let first = reader.load(&m);
        let second = reader.load(&m);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reader.reads(), 1);

        let changed = Module::from_config(
            ModuleConfig::new("alpha", tmp.path()).with_priority(99),
            &CoordinatorConfig::default(),
        );
        reader.load(&changed);
        assert_eq!(reader.reads(), 2);
        assert!(reader.cached("alpha").is_some());
    }
}
