//! Module registration records.
//!
//! A module is one independently built unit loaded into the host. It owns a
//! root directory and a dependency root containing its bundled shared
//! packages and generated autoload artifacts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::config::CoordinatorConfig;
use crate::util::fs::normalize_dir;

/// Default priority for modules that don't declare one.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Name of the dependency root below a module's root when none is given.
pub const DEFAULT_DEPENDENCY_DIR: &str = "vendor";

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// Registration input, as supplied by the host's registration event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Unique module slug
    pub slug: String,

    /// Module root directory
    pub root_dir: PathBuf,

    /// Dependency root (defaults to `<root_dir>/vendor`)
    #[serde(default)]
    pub dependency_root: Option<PathBuf>,

    /// Merge priority (lower sorts first)
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Whether this module is the default preferred module
    #[serde(default, alias = "default")]
    pub is_default: bool,
}

impl ModuleConfig {
    /// Create a registration with default priority.
    pub fn new(slug: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        ModuleConfig {
            slug: slug.into(),
            root_dir: root_dir.into(),
            dependency_root: None,
            priority: DEFAULT_PRIORITY,
            is_default: false,
        }
    }

    /// Set the merge priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Mark as the default preferred module.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Use an explicit dependency root.
    pub fn with_dependency_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dependency_root = Some(dir.into());
        self
    }

    /// Resolve relative directories against `base`.
    pub fn rebase(&mut self, base: &Path) {
        if self.root_dir.is_relative() {
            self.root_dir = base.join(&self.root_dir);
        }
        if let Some(dep) = &self.dependency_root {
            if dep.is_relative() {
                self.dependency_root = Some(base.join(dep));
            }
        }
    }
}

/// A registered module. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    slug: String,
    root_dir: PathBuf,
    dependency_root: PathBuf,
    packages_dir: PathBuf,
    priority: i32,
    is_default: bool,
}

impl Module {
    /// Normalize a registration into a module record.
    pub fn from_config(config: ModuleConfig, layout: &CoordinatorConfig) -> Self {
        let root_dir = normalize_dir(&config.root_dir);
        let dependency_root = match config.dependency_root {
            Some(dir) => normalize_dir(&dir),
            None => root_dir.join(DEFAULT_DEPENDENCY_DIR),
        };
        let packages_dir = dependency_root.join(&layout.shared_vendor);

        Module {
            slug: config.slug,
            root_dir,
            dependency_root,
            packages_dir,
            priority: config.priority,
            is_default: config.is_default,
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn dependency_root(&self) -> &Path {
        &self.dependency_root
    }

    /// Directory holding this module's copies of the shared packages.
    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }
}
