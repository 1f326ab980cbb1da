//! Configuration support for the coordinator.
//!
//! Two layers exist:
//! - `CoordinatorConfig`: layout conventions and tuning shared by every module
//! - `HostConfig`: a `Coordinator.toml` file listing participating modules,
//!   used by the `coordinator` binary in place of the host's registration events
//!
//! The preferred module can always be forced with the
//! `AUTOLOAD_COORDINATOR_REF` environment variable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::ModuleConfig;

/// Environment variable that overrides the preferred module.
pub const PREFERRED_ENV: &str = "AUTOLOAD_COORDINATOR_REF";

/// Default host configuration file name.
pub const HOST_CONFIG_NAME: &str = "Coordinator.toml";

/// Coordinator layout and tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Namespace prefix family arbitrated across modules (matched
    /// case-insensitively).
    pub shared_namespace: String,

    /// Directory under each dependency root holding shared packages
    pub shared_vendor: String,

    /// Directory under each dependency root holding generated autoload artifacts
    pub manifest_dir: String,

    /// Package descriptor file name
    pub descriptor_file: String,

    /// Conventional asset subdirectory that may carry its own descriptor
    pub asset_subdir: String,

    /// How many directory levels `detect_owning_package` climbs
    pub detect_depth: usize,

    /// Time-to-live of persisted cache entries, in seconds
    pub cache_ttl_secs: u64,

    /// Explicit preferred module slug
    pub preferred: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            shared_namespace: "Shared\\".to_string(),
            shared_vendor: "shared".to_string(),
            manifest_dir: "autoload".to_string(),
            descriptor_file: "package.json".to_string(),
            asset_subdir: "icon".to_string(),
            detect_depth: 4,
            cache_ttl_secs: 3600,
            preferred: None,
        }
    }
}

impl CoordinatorConfig {
    /// Cache time-to-live.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Whether a namespace prefix belongs to the shared-namespace root.
    pub fn is_shared_prefix(&self, prefix: &str) -> bool {
        let root = self.shared_namespace.as_bytes();
        let prefix = prefix.as_bytes();
        !root.is_empty()
            && prefix.len() >= root.len()
            && prefix[..root.len()].eq_ignore_ascii_case(root)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(PREFERRED_ENV) {
            self.apply_preferred_override(Some(value));
        }
        self
    }

    fn apply_preferred_override(&mut self, value: Option<String>) {
        if let Some(value) = value.map(|v| v.trim().to_string()) {
            if !value.is_empty() {
                self.preferred = Some(value);
            }
        }
    }
}

/// Host configuration file (`Coordinator.toml`).
///
/// ```toml
/// [coordinator]
/// shared_namespace = "Acme\\"
///
/// [[module]]
/// slug = "alpha"
/// root_dir = "modules/alpha"
/// priority = 10
/// default = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Coordinator settings
    pub coordinator: CoordinatorConfig,

    /// Participating modules, in registration order
    #[serde(rename = "module")]
    pub modules: Vec<ModuleConfig>,
}

impl HostConfig {
    /// Load host configuration from a file.
    ///
    /// Relative module directories are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read host config: {}", path.display()))?;

        let mut config: HostConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse host config: {}", path.display()))?;

        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        for module in &mut config.modules {
            module.rebase(&base);
        }

        Ok(config)
    }
}

/// Default directory for the persisted file cache.
pub fn default_cache_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "autoload-coordinator")
        .map(|dirs| dirs.cache_dir().to_path_buf())
}
