pub mod file;
pub mod kv_store;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::CoreResult;

/// Async JSON document storage addressed by key segments.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn write(&self, keys: &[&str], data: &Value) -> CoreResult<()>;
    async fn read(&self, keys: &[&str]) -> CoreResult<Option<Value>>;
}

pub type SharedStorage = Arc<dyn Storage>;

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A sibling of `path` that no other writer in any process is using, for
/// write-then-rename replacement.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let sequence = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{sequence}.tmp", std::process::id()));
    path.with_file_name(name)
}

pub use file::FileStorage;
pub use kv_store::{FileKvStore, KvStore, MemoryKvStore};
pub use memory::MemoryStorage;
