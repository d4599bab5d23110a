//! Key-value backends
//!
//! Backends are synchronous: a write returns only once the value is
//! visible to subsequent reads.

use crate::error::{StoreError, StoreResult};
use dashmap::DashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Namespaced string key-value storage
pub trait StoreBackend: Send + Sync + Debug {
    /// Read the value under `key`
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write `value` under `key`
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete `key`; missing keys are not an error
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// In-memory backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, String>,
}

impl MemoryBackend {
    /// Create empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StoreBackend for MemoryBackend {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a directory
///
/// Writes go to a temporary sibling and are renamed into place, so a
/// crash never leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open (and create) the directory at `root`
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the directory cannot be created
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StoreError::io_error(&root, e))?;
        Ok(Self { root })
    }

    /// Backing directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl StoreBackend for FileBackend {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io_error(path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        std::fs::write(&tmp, value).map_err(|e| StoreError::io_error(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StoreError::io_error(&path, e))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io_error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(backend: &dyn StoreBackend) {
        assert_eq!(backend.get("tasks_x").unwrap(), None);
        backend.set("tasks_x", "[]").unwrap();
        assert_eq!(backend.get("tasks_x").unwrap().as_deref(), Some("[]"));
        backend.set("tasks_x", "[1]").unwrap();
        assert_eq!(backend.get("tasks_x").unwrap().as_deref(), Some("[1]"));
        backend.remove("tasks_x").unwrap();
        backend.remove("tasks_x").unwrap();
        assert_eq!(backend.get("tasks_x").unwrap(), None);
    }

    #[test]
    fn memory_backend_semantics() {
        let backend = MemoryBackend::new();
        exercise(&backend);
        assert!(backend.is_empty());
    }

    #[test]
    fn file_backend_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("store")).unwrap();
        exercise(&backend);
    }

    #[test]
    fn file_backend_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        FileBackend::open(dir.path()).unwrap().set("goals_y", "[]").unwrap();
        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(reopened.get("goals_y").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("goals_y.json").exists());
    }
}
