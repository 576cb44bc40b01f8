//! The remote store: history operations over a [`SnapshotFile`].

pub mod snapshot_file;

use serde::Serialize;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::snapshot::{Snapshot, SnapshotCollection};

pub use snapshot_file::{SnapshotFile, HISTORY_KEYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const OK: Ack = Ack { ok: true };
}

#[derive(Clone)]
pub struct HistoryService {
    file: Arc<SnapshotFile>,
}

impl HistoryService {
    pub fn new(file: SnapshotFile) -> Self {
        Self {
            file: Arc::new(file),
        }
    }

    pub async fn list(&self) -> SnapshotCollection {
        self.file.load().await
    }

    /// Stamps `text` with the server clock and appends it. Blank text is an
    /// `InvalidInput` error and nothing is written.
    pub async fn append(&self, text: &str) -> CoreResult<Snapshot> {
        let snapshot = Snapshot::capture(text)?;
        let count = self.file.append(snapshot.clone()).await?;
        tracing::debug!(count, "snapshot appended");
        Ok(snapshot)
    }

    pub async fn clear(&self) -> CoreResult<()> {
        self.file.clear().await?;
        tracing::debug!("history cleared");
        Ok(())
    }

    pub fn health(&self) -> Ack {
        Ack::OK
    }
}
