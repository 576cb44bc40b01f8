//! Synchronous string key-value stores backing the client-side fallback.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};
use crate::storage::staging_path;

/// String key-value storage scoped to one client runtime.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> CoreResult<()>;
    /// Returns whether the key was present.
    fn remove(&mut self, key: &str) -> CoreResult<bool>;
}

// --- Memory Implementation ---

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: BTreeMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> CoreResult<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> CoreResult<bool> {
        Ok(self.data.remove(key).is_some())
    }
}

// --- File Implementation ---

/// Every entry lives in one JSON object file, rewritten on each change.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    data: BTreeMap<String, String>,
}

impl FileKvStore {
    /// Opens the store at `path`. A missing or unreadable file opens empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|error| {
                tracing::warn!(path = %path.display(), "ignoring corrupt local store: {error}");
                BTreeMap::new()
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                tracing::warn!(path = %path.display(), "cannot read local store: {error}");
                BTreeMap::new()
            }
        };
        Self { path, data }
    }

    fn flush(&self) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CoreError::Internal(format!(
                    "failed to create local store directory {}: {error}",
                    parent.display()
                ))
            })?;
        }
        let serialized = serde_json::to_vec(&self.data)
            .map_err(|error| CoreError::Internal(format!("local store serialize error: {error}")))?;
        // Stage a sibling and rename it so the file is never half-written.
        let staging = staging_path(&self.path);
        if let Err(error) = std::fs::write(&staging, serialized) {
            let _ = std::fs::remove_file(&staging);
            return Err(CoreError::Internal(format!(
                "failed to write local store {}: {error}",
                staging.display()
            )));
        }
        std::fs::rename(&staging, &self.path).map_err(|error| {
            let _ = std::fs::remove_file(&staging);
            CoreError::Internal(format!(
                "failed to replace local store {}: {error}",
                self.path.display()
            ))
        })
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> CoreResult<()> {
        let previous = self.data.insert(key.to_string(), value);
        if let Err(error) = self.flush() {
            // Keep memory consistent with what is on disk.
            match previous {
                Some(previous) => self.data.insert(key.to_string(), previous),
                None => self.data.remove(key),
            };
            return Err(error);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> CoreResult<bool> {
        let Some(previous) = self.data.remove(key) else {
            return Ok(false);
        };
        if let Err(error) = self.flush() {
            self.data.insert(key.to_string(), previous);
            return Err(error);
        }
        Ok(true)
    }
}
