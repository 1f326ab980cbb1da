//! Package descriptors.
//!
//! Every shared package directory carries a small JSON document declaring at
//! least its `name` and optionally its `version`. Descriptors that cannot be
//! parsed or have no name are not packages as far as the coordinator is
//! concerned: they are skipped, never reported as errors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::resolver::version::{Version, DEFAULT_VERSION};
use crate::util::fs::{read_json, ArtifactError};

/// Name and version read from a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: Version,
}

/// Parse a descriptor file.
///
/// Returns `None` for missing, unreadable or malformed documents and for
/// documents without a usable `name`. A missing `version` defaults to
/// `0.0.0`; numeric versions are accepted as written.
pub fn parse_descriptor(path: &Path) -> Option<PackageInfo> {
    let doc: serde_json::Value = match read_json(path) {
        Ok(doc) => doc,
        Err(e) if e.is_missing() => return None,
        Err(e @ ArtifactError::Malformed { .. }) => {
            tracing::debug!("skipping descriptor: {}", e);
            return None;
        }
        Err(e) => {
            tracing::warn!("{}", e);
            return None;
        }
    };

    let name = match doc.get("name") {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => {
            tracing::debug!("skipping descriptor without name: {}", path.display());
            return None;
        }
    };

    let version = match doc.get("version") {
        Some(serde_json::Value::String(s)) => Version::parse(s),
        Some(serde_json::Value::Number(n)) => Version::parse(&n.to_string()),
        _ => Version::parse(DEFAULT_VERSION),
    };

    Some(PackageInfo { name, version })
}

/// A descriptor found while scanning a packages directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundDescriptor {
    /// The descriptor file
    pub path: PathBuf,
    /// The package directory it describes
    pub package_dir: PathBuf,
}

/// Find descriptor files under a packages directory.
///
/// A descriptor sits either directly inside a package directory
/// (`<root>/<pkg>/<descriptor>`) or inside the package's asset subdirectory
/// (`<root>/<pkg>/<asset_subdir>/<descriptor>`). Nothing deeper is searched.
/// An unreadable root yields an empty list.
pub fn scan_descriptors(root: &Path, descriptor_file: &str, asset_subdir: &str) -> Vec<FoundDescriptor> {
    if !root.is_dir() {
        tracing::debug!("no packages directory at {}", root.display());
        return Vec::new();
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(2)
        .max_depth(3)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() || entry.file_name() != descriptor_file {
            continue;
        }

        let Some(parent) = entry.path().parent() else {
            continue;
        };
        let package_dir = match entry.depth() {
            2 => parent.to_path_buf(),
            3 if parent.file_name().is_some_and(|n| n == asset_subdir) => match parent.parent() {
                Some(pkg) => pkg.to_path_buf(),
                None => continue,
            },
            _ => continue,
        };

        found.push(FoundDescriptor {
            path: entry.path().to_path_buf(),
            package_dir,
        });
    }

    found
}

/// Finds the package owning a file by walking up to its descriptor.
///
/// Results are memoized per input path for the life of the detector.
#[derive(Debug)]
pub struct PackageDetector {
    descriptor_file: String,
    max_levels: usize,
    memo: HashMap<PathBuf, Option<PackageInfo>>,
}

impl PackageDetector {
    pub fn new(descriptor_file: impl Into<String>, max_levels: usize) -> Self {
        PackageDetector {
            descriptor_file: descriptor_file.into(),
            max_levels,
            memo: HashMap::new(),
        }
    }

    /// Detect the package owning `path`.
    ///
    /// Starts at the containing directory (or `path` itself when it is a
    /// directory) and checks at most `max_levels` directories, stopping early
    /// at the filesystem root. The first descriptor found decides the
    /// outcome, even when it turns out to be malformed.
    pub fn detect_owning_package(&mut self, path: &Path) -> Option<PackageInfo> {
        if let Some(hit) = self.memo.get(path) {
            return hit.clone();
        }

        let result = self.walk_up(path);
        self.memo.insert(path.to_path_buf(), result.clone());
        result
    }

    fn walk_up(&self, path: &Path) -> Option<PackageInfo> {
        let mut dir = if path.is_dir() {
            path.to_path_buf()
        } else {
            path.parent()?.to_path_buf()
        };

        let mut levels = 0;
        while levels < self.max_levels {
            levels += 1;

            let candidate = dir.join(&self.descriptor_file);
            if candidate.is_file() {
                return parse_descriptor(&candidate);
            }

            match dir.parent() {
                // Stop before the filesystem root.
                Some(parent) if parent != dir && parent.parent().is_some() => {
                    dir = parent.to_path_buf();
                }
                _ => break,
            }
        }

        None
    }

    /// Forget memoized results.
    pub fn clear(&mut self) {
        self.memo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_parse_descriptor_variants() {
        let tmp = TempDir::new().unwrap();

        let full = tmp.path().join("full.json");
        write(&full, r#"{"name": "acme/log", "version": "2.1.0"}"#);
        let info = parse_descriptor(&full).unwrap();
        assert_eq!(info.name, "acme/log");
        assert_eq!(info.version, Version::parse("2.1.0"));

        let unversioned = tmp.path().join("unversioned.json");
        write(&unversioned, r#"{"name": "acme/log"}"#);
        assert_eq!(
            parse_descriptor(&unversioned).unwrap().version.as_str(),
            DEFAULT_VERSION
        );

        let numeric = tmp.path().join("numeric.json");
        write(&numeric, r#"{"name": "acme/log", "version": 3}"#);
        assert_eq!(parse_descriptor(&numeric).unwrap().version.as_str(), "3");
    }

    #[test]
    fn test_parse_descriptor_rejects() {
        let tmp = TempDir::new().unwrap();

        let broken = tmp.path().join("broken.json");
        write(&broken, r#"{"name": "acme/log", "#);
        assert!(parse_descriptor(&broken).is_none());

        let nameless = tmp.path().join("nameless.json");
        write(&nameless, r#"{"version": "1.0.0"}"#);
        assert!(parse_descriptor(&nameless).is_none());

        let list = tmp.path().join("list.json");
        write(&list, r#"["acme/log"]"#);
        assert!(parse_descriptor(&list).is_none());

        assert!(parse_descriptor(&tmp.path().join("absent.json")).is_none());
    }

    #[test]
    fn test_scan_descriptors_bounded_depth() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("shared");
        write(&root.join("log/package.json"), "{}");
        write(&root.join("icons/icon/package.json"), "{}");
        write(&root.join("deep/a/b/package.json"), "{}");
        write(&root.join("other/assets/package.json"), "{}");
        write(&root.join("package.json"), "{}");

        let found = scan_descriptors(&root, "package.json", "icon");
        let dirs: Vec<_> = found.iter().map(|f| f.package_dir.clone()).collect();

        assert_eq!(dirs, vec![root.join("icons"), root.join("log")]);
        assert_eq!(found[0].path, root.join("icons/icon/package.json"));
    }

    #[test]
    fn test_scan_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_descriptors(&tmp.path().join("none"), "package.json", "icon").is_empty());
    }

    #[test]
    fn test_detect_owning_package_walks_up() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("shared/log");
        write(&pkg.join("package.json"), r#"{"name": "acme/log", "version": "1.2.0"}"#);
        let file = pkg.join("src/inc/bootstrap.inc");
        write(&file, "");

        let mut detector = PackageDetector::new("package.json", 4);
        let info = detector.detect_owning_package(&file).unwrap();
        assert_eq!(info.name, "acme/log");
        assert_eq!(info.version.as_str(), "1.2.0");
    }

    #[test]
    fn test_detect_respects_level_bound() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("pkg");
        write(&pkg.join("package.json"), r#"{"name": "acme/deep"}"#);
        let file = pkg.join("a/b/c/d/init.inc");
        write(&file, "");

        // d, c, b, a are checked; pkg would be the fifth level.
        let mut detector = PackageDetector::new("package.json", 4);
        assert!(detector.detect_owning_package(&file).is_none());

        let mut wider = PackageDetector::new("package.json", 5);
        assert_eq!(wider.detect_owning_package(&file).unwrap().name, "acme/deep");
    }

    #[test]
    fn test_detect_stops_at_malformed_descriptor() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("outer/package.json"), r#"{"name": "acme/outer"}"#);
        write(&tmp.path().join("outer/inner/package.json"), "not json");
        let file = tmp.path().join("outer/inner/init.inc");
        write(&file, "");

        let mut detector = PackageDetector::new("package.json", 4);
        assert!(detector.detect_owning_package(&file).is_none());
    }

    #[test]
    fn test_detect_is_memoized() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("pkg");
        write(&pkg.join("package.json"), r#"{"name": "acme/memo", "version": "1.0.0"}"#);
        let file = pkg.join("init.inc");
        write(&file, "");

        let mut detector = PackageDetector::new("package.json", 4);
        assert!(detector.detect_owning_package(&file).is_some());

        fs::remove_file(pkg.join("package.json")).unwrap();
        assert_eq!(
            detector.detect_owning_package(&file).unwrap().name,
            "acme/memo"
        );

        detector.clear();
        assert!(detector.detect_owning_package(&file).is_none());
    }
}
