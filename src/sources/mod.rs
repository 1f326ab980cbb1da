//! Where package and cache information comes from.
//!
//! - `descriptor`: per-package descriptor parsing, scanning and ownership detection
//! - `index`: the name to highest-version package index
//! - `cache`: the persistent store shared between processes

pub mod cache;
pub mod descriptor;
pub mod index;

pub use cache::{CacheStore, FileCache, MemoryCache};
pub use descriptor::{PackageDetector, PackageInfo};
pub use index::{PackageDescriptor, PackageIndex};

/// Logical cache key of the package version index.
pub const PACKAGE_INDEX_KEY: &str = "autoload_pkg_index";

/// Logical cache key of the grouped init files.
pub const FILE_GROUPS_KEY: &str = "autoload_pkg_files";

/// Physical cache key for a logical key and a module-set fingerprint.
pub fn cache_key(logical: &str, fingerprint: &str) -> String {
    format!("{}:{}", logical, fingerprint)
}
