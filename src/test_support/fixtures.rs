//! On-disk module fixtures.
//!
//! A [`ModuleFixture`] describes one module tree: bundled shared packages
//! with their descriptors, the autoload artifacts and any files they point
//! at. `write_to` lays it out under a base directory using the default
//! layout (`<root>/vendor/autoload/*.json`, `<root>/vendor/shared/<pkg>`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::ModuleConfig;

/// A bundled package in a module's shared vendor directory.
#[derive(Debug, Clone)]
pub struct PackageFixture {
    /// Directory name under the shared vendor directory
    pub dir: String,
    /// Descriptor `name`
    pub name: String,
    /// Descriptor `version`, omitted from the descriptor when `None`
    pub version: Option<String>,
    /// Place the descriptor in the asset subdirectory instead
    pub in_asset_dir: bool,
}

/// Fixture for one module tree.
#[derive(Debug, Clone)]
pub struct ModuleFixture {
    pub slug: String,
    pub priority: Option<i32>,
    pub is_default: bool,
    pub packages: Vec<PackageFixture>,
    /// Prefix -> directories relative to the dependency root
    pub namespaces: BTreeMap<String, Vec<String>>,
    /// Class -> file relative to the dependency root
    pub classes: BTreeMap<String, String>,
    /// Identifier -> file relative to the dependency root
    pub init_files: BTreeMap<String, String>,
    /// Extra files relative to the dependency root
    pub files: BTreeMap<PathBuf, String>,
}

impl ModuleFixture {
    pub fn new(slug: impl Into<String>) -> Self {
        ModuleFixture {
            slug: slug.into(),
            priority: None,
            is_default: false,
            packages: Vec::new(),
            namespaces: BTreeMap::new(),
            classes: BTreeMap::new(),
            init_files: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Bundle a shared package with a descriptor in its directory.
    pub fn with_package(mut self, dir: &str, name: &str, version: &str) -> Self {
        self.packages.push(PackageFixture {
            dir: dir.to_string(),
            name: name.to_string(),
            version: Some(version.to_string()),
            in_asset_dir: false,
        });
        self
    }

    /// Bundle a shared package whose descriptor lives in the asset subdirectory.
    pub fn with_asset_package(mut self, dir: &str, name: &str, version: &str) -> Self {
        self.packages.push(PackageFixture {
            dir: dir.to_string(),
            name: name.to_string(),
            version: Some(version.to_string()),
            in_asset_dir: true,
        });
        self
    }

    /// Bundle a shared package and map `prefix` to its `src` directory.
    pub fn with_shared_package(self, prefix: &str, dir: &str, name: &str, version: &str) -> Self {
        self.with_package(dir, name, version)
            .with_namespace(prefix, &format!("shared/{}/src", dir))
    }

    pub fn with_namespace(mut self, prefix: &str, dir: &str) -> Self {
        self.namespaces
            .entry(prefix.to_string())
            .or_default()
            .push(dir.to_string());
        self
    }

    pub fn with_class(mut self, class: &str, file: &str) -> Self {
        self.classes.insert(class.to_string(), file.to_string());
        self
    }

    /// Declare an init file and write its contents.
    pub fn with_init_file(mut self, identifier: &str, file: &str, contents: &str) -> Self {
        self.init_files
            .insert(identifier.to_string(), file.to_string());
        self.files.insert(PathBuf::from(file), contents.to_string());
        self
    }

    pub fn with_file(mut self, file: &str, contents: &str) -> Self {
        self.files.insert(PathBuf::from(file), contents.to_string());
        self
    }

    /// Write the module under `base/<slug>` and return its registration.
    pub fn write_to(&self, base: &Path) -> std::io::Result<ModuleConfig> {
        let root = base.join(&self.slug);
        let vendor = root.join("vendor");
        std::fs::create_dir_all(&vendor)?;

        for pkg in &self.packages {
            let mut dir = vendor.join("shared").join(&pkg.dir);
            if pkg.in_asset_dir {
                dir = dir.join("icon");
            }
            std::fs::create_dir_all(&dir)?;
            let mut descriptor = serde_json::json!({ "name": pkg.name });
            if let Some(version) = &pkg.version {
                descriptor["version"] = serde_json::Value::String(version.clone());
            }
            std::fs::write(dir.join("package.json"), descriptor.to_string())?;
        }

        for (file, contents) in &self.files {
            let path = vendor.join(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, contents)?;
        }

        let autoload = vendor.join("autoload");
        std::fs::create_dir_all(&autoload)?;
        write_json(&autoload.join("namespaces.json"), &self.namespaces)?;
        write_json(&autoload.join("classmap.json"), &self.classes)?;
        write_json(&autoload.join("files.json"), &self.init_files)?;

        let mut config = ModuleConfig::new(&self.slug, root);
        if let Some(priority) = self.priority {
            config = config.with_priority(priority);
        }
        if self.is_default {
            config = config.as_default();
        }
        Ok(config)
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Manifest;
    use tempfile::TempDir;

    #[test]
    fn test_module_fixture_layout() {
        let tmp = TempDir::new().unwrap();
        let config = ModuleFixture::new("alpha")
            .with_shared_package("Shared\\Log\\", "log", "acme/log", "1.2.0")
            .with_asset_package("icons", "acme/icons", "0.3.0")
            .with_init_file("log-helpers", "shared/log/helpers.inc", "helpers")
            .write_to(tmp.path())
            .unwrap();

        let vendor = tmp.path().join("alpha/vendor");
        assert_eq!(config.root_dir, tmp.path().join("alpha"));
        assert!(vendor.join("shared/log/package.json").is_file());
        assert!(vendor.join("shared/icons/icon/package.json").is_file());

        let manifest = Manifest::read(&vendor, "autoload");
        assert_eq!(
            manifest.namespace_map["Shared\\Log\\"],
            vec![vendor.join("shared/log/src")]
        );
        assert_eq!(
            manifest.init_files["log-helpers"],
            vendor.join("shared/log/helpers.inc")
        );
    }
}
