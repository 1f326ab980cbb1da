//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Why a generated artifact could not be used.
///
/// None of these are fatal: callers log them and continue with an empty
/// structure.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed artifact {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    /// True when the artifact simply does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, ArtifactError::Missing { .. })
    }
}

/// Read and deserialize a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ArtifactError::Missing {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ArtifactError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&contents).map_err(|source| ArtifactError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Does not touch the filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    _ => false,
                };
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve an artifact path against a base directory.
///
/// Absolute paths are kept, relative ones are joined onto `base`; both are
/// lexically normalized.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        clean_path(path)
    } else {
        clean_path(&base.join(path))
    }
}

/// Strip trailing separators from a configured directory.
pub fn normalize_dir(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    let trimmed = s.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        path.to_path_buf()
    } else {
        clean_path(Path::new(trimmed))
    }
}

/// Check if a path is inside another path (component-wise).
pub fn is_inside(path: &Path, parent: &Path) -> bool {
    path.starts_with(parent)
}
