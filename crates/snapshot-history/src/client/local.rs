//! The client-side fallback store.

use parking_lot::Mutex;
use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};
use crate::snapshot::{decode_collection_str, Snapshot, SnapshotCollection};
use crate::storage::{FileKvStore, KvStore, MemoryKvStore};

/// Key holding the serialized collection.
pub const LOCAL_HISTORY_KEY: &str = "my_rime_select_all_history";

/// Snapshot history kept as one JSON array under [`LOCAL_HISTORY_KEY`].
pub struct LocalStore {
    kv: Mutex<Box<dyn KvStore>>,
}

impl LocalStore {
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv: Mutex::new(kv) }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryKvStore::new()))
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(FileKvStore::open(path)))
    }

    pub fn list(&self) -> SnapshotCollection {
        let kv = self.kv.lock();
        kv.get(LOCAL_HISTORY_KEY)
            .map(|raw| decode_collection_str(&raw))
            .unwrap_or_default()
    }

    /// Stamps `text` with the local clock and appends it.
    pub fn append(&self, text: &str) -> CoreResult<Snapshot> {
        let snapshot = Snapshot::capture(text)?;
        let mut kv = self.kv.lock();
        let mut snapshots = kv
            .get(LOCAL_HISTORY_KEY)
            .map(|raw| decode_collection_str(&raw))
            .unwrap_or_default();
        snapshots.push(snapshot.clone());
        let serialized = serde_json::to_string(&snapshots).map_err(|error| {
            CoreError::Internal(format!("failed to serialize local history: {error}"))
        })?;
        kv.set(LOCAL_HISTORY_KEY, serialized)?;
        Ok(snapshot)
    }

    pub fn clear(&self) -> CoreResult<()> {
        self.kv.lock().remove(LOCAL_HISTORY_KEY)?;
        Ok(())
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}
