//! In-memory [`Storage`] for tests and throwaway servers.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::storage::Storage;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(keys: &[&str]) -> CoreResult<String> {
        if keys.is_empty() {
            return Err(CoreError::InvalidInput("storage keys empty".to_string()));
        }
        Ok(keys.join("/"))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn write(&self, keys: &[&str], data: &Value) -> CoreResult<()> {
        let key = Self::key(keys)?;
        self.documents.lock().insert(key, data.clone());
        Ok(())
    }

    async fn read(&self, keys: &[&str]) -> CoreResult<Option<Value>> {
        let key = Self::key(keys)?;
        Ok(self.documents.lock().get(&key).cloned())
    }
}
