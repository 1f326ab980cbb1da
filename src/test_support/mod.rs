//! Test utilities for coordinator unit tests.
//!
//! Builders for on-disk module trees plus a few canned scenarios shared by
//! several test modules.

pub mod fixtures;

use std::path::Path;

use crate::core::ModuleConfig;

pub use fixtures::*;

/// Two modules bundling `acme/log` under `Shared\Log\`.
///
/// `alpha` ships 1.0.0, `beta` ships 2.0.0. Each declares the package's
/// helper file under its own identifier with different contents, and each
/// has a private namespace of its own.
pub fn version_conflict(base: &Path) -> std::io::Result<(ModuleConfig, ModuleConfig)> {
    let alpha = ModuleFixture::new("alpha")
        .with_shared_package("Shared\\Log\\", "log", "acme/log", "1.0.0")
        .with_namespace("Alpha\\", "../src")
        .with_file("shared/log/src/Writer.inc", "alpha writer")
        .with_init_file("alpha-log", "shared/log/helpers.inc", "helpers 1.0.0")
        .write_to(base)?;
    let beta = ModuleFixture::new("beta")
        .with_shared_package("Shared\\Log\\", "log", "acme/log", "2.0.0")
        .with_namespace("Beta\\", "../src")
        .with_file("shared/log/src/Writer.inc", "beta writer")
        .with_init_file("beta-log", "shared/log/helpers.inc", "helpers 2.0.0")
        .write_to(base)?;
    Ok((alpha, beta))
}

/// Assertion helpers for testing.
pub mod assertions {
    use std::path::Path;

    /// Assert that `path` lies under `dir`.
    pub fn assert_under(path: &Path, dir: &Path) {
        assert!(
            path.starts_with(dir),
            "expected {} to be under {}",
            path.display(),
            dir.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_version_conflict_writes_both_modules() {
        let tmp = TempDir::new().unwrap();
        let (alpha, beta) = version_conflict(tmp.path()).unwrap();

        assert_eq!(alpha.slug, "alpha");
        assert_eq!(beta.slug, "beta");
        assertions::assert_under(
            &tmp.path().join("beta/vendor/shared/log/helpers.inc"),
            &beta.root_dir,
        );
        assert!(tmp.path().join("beta/vendor/shared/log/helpers.inc").is_file());
    }
}
