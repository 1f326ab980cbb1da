//! Persistent key/value cache.
//!
//! The package index and the grouped init files are expensive to rebuild
//! (they require walking every module's dependency tree), so they are kept
//! in a store shared between processes with a bounded time-to-live.
//!
//! No locking is done. Concurrent rebuilds race and the last writer wins,
//! which is harmless because a rebuild from the same inputs produces the
//! same value.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::hash::sha256_str;

/// A shared cache of JSON-encoded values.
pub trait CacheStore: Send + Sync {
    /// Get a live value.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value for at most `ttl`.
    fn set(&self, key: &str, value: &str, ttl: Duration);

    /// Remove a value.
    fn delete(&self, key: &str);
}

/// Read and decode a typed value. Undecodable entries read as absent.
pub fn get_json<T: for<'de> Deserialize<'de>>(store: &dyn CacheStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("ignoring undecodable cache entry `{}`: {}", key, e);
            None
        }
    }
}

/// Encode and store a typed value.
pub fn set_json<T: Serialize>(store: &dyn CacheStore, key: &str, value: &T, ttl: Duration) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw, ttl),
        Err(e) => tracing::warn!("failed to encode cache entry `{}`: {}", key, e),
    }
}

/// Process-local cache. Used when the host supplies no shared store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live entry exists.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((value, expires)) if Instant::now() < *expires => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        }
    }

    fn delete(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// On-disk entry format.
#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    key: String,
    expires_at: u64,
    value: String,
}

/// Cache stored as one file per key in a directory shared by processes.
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so readers never observe a partial entry.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (and create) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create cache directory: {}", dir.display()))?;
        Ok(FileCache { dir })
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sha256_str(key)))
    }

    fn write_entry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = FileEntry {
            key: key.to_string(),
            expires_at: unix_now().saturating_add(ttl.as_secs()),
            value: value.to_string(),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("failed to create temp file in {}", self.dir.display()))?;
        serde_json::to_writer(&mut tmp, &entry)?;
        tmp.flush()?;
        tmp.persist(self.entry_path(key))
            .with_context(|| format!("failed to persist cache entry `{}`", key))?;
        Ok(())
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key);
        let contents = fs::read_to_string(&path).ok()?;
        let entry: FileEntry = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("corrupt cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.key != key || entry.expires_at <= unix_now() {
            return None;
        }
        Some(entry.value)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        if let Err(e) = self.write_entry(key, value, ttl) {
            tracing::warn!("{:#}", e);
        }
    }

    fn delete(&self, key: &str) {
        let path = self.entry_path(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("failed to delete cache entry {}: {}", path.display(), e);
            }
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
