//! The remote store's backing document.

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::snapshot::{decode_collection, Snapshot, SnapshotCollection};
use crate::storage::SharedStorage;

/// `<data dir>/history.json` when backed by [`crate::storage::FileStorage`].
pub const HISTORY_KEYS: [&str; 1] = ["history"];

/// The full snapshot collection, read and rewritten whole on every mutation.
///
/// With serialized writes (the default) each read-modify-write cycle holds
/// `write_lock`, so concurrent appends never drop each other's entries.
/// Without it the last writer wins.
pub struct SnapshotFile {
    storage: SharedStorage,
    serialize_writes: bool,
    write_lock: Mutex<()>,
}

impl SnapshotFile {
    pub fn new(storage: SharedStorage) -> Self {
        Self {
            storage,
            serialize_writes: true,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_serialized_writes(mut self, serialize_writes: bool) -> Self {
        self.serialize_writes = serialize_writes;
        self
    }

    /// Missing, unreadable and malformed documents all load as empty history.
    pub async fn load(&self) -> SnapshotCollection {
        match self.storage.read(&HISTORY_KEYS).await {
            Ok(Some(value)) => decode_collection(value),
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!("treating unreadable history as empty: {error}");
                Vec::new()
            }
        }
    }

    pub async fn save(&self, snapshots: &[Snapshot]) -> CoreResult<()> {
        let value = serde_json::to_value(snapshots).map_err(|error| {
            CoreError::Internal(format!("failed to serialize history: {error}"))
        })?;
        self.storage.write(&HISTORY_KEYS, &value).await
    }

    pub async fn append(&self, snapshot: Snapshot) -> CoreResult<usize> {
        let _guard = self.lock_for_write().await;
        let mut snapshots = self.load().await;
        snapshots.push(snapshot);
        self.save(&snapshots).await?;
        Ok(snapshots.len())
    }

    pub async fn clear(&self) -> CoreResult<()> {
        let _guard = self.lock_for_write().await;
        self.storage
            .write(&HISTORY_KEYS, &Value::Array(Vec::new()))
            .await
    }

    async fn lock_for_write(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        if self.serialize_writes {
            Some(self.write_lock.lock().await)
        } else {
            None
        }
    }
}
