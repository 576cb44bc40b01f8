use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::storage::{staging_path, Storage};

/// JSON documents stored as `<root>/<key>/.../<last>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path_for(&self, keys: &[&str]) -> CoreResult<PathBuf> {
        if keys.is_empty() {
            return Err(CoreError::InvalidInput("storage keys empty".to_string()));
        }
        let mut path = self.root.clone();
        for key in &keys[..keys.len() - 1] {
            validate_key(key)?;
            path.push(key);
        }
        let mut filename = keys[keys.len() - 1].to_string();
        validate_key(&filename)?;
        if !filename.ends_with(".json") {
            filename.push_str(".json");
        }
        path.push(filename);
        Ok(path)
    }

    async fn ensure_parent_dir(path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| {
                    CoreError::Internal(format!(
                        "failed to create storage directory {}: {error}",
                        parent.display()
                    ))
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn write(&self, keys: &[&str], data: &Value) -> CoreResult<()> {
        let path = self.path_for(keys)?;
        Self::ensure_parent_dir(&path).await?;
        let serialized = serde_json::to_vec(data)
            .map_err(|error| CoreError::Internal(format!("storage serialize error: {error}")))?;
        // Write a sibling first so readers never observe a half-written document.
        let staging = staging_path(&path);
        if let Err(error) = tokio::fs::write(&staging, serialized).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(CoreError::Internal(format!(
                "failed to write storage file {}: {error}",
                staging.display()
            )));
        }
        if let Err(error) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(CoreError::Internal(format!(
                "failed to replace storage file {}: {error}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), "storage document written");
        Ok(())
    }

    async fn read(&self, keys: &[&str]) -> CoreResult<Option<Value>> {
        let path = self.path_for(keys)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(CoreError::Internal(format!(
                    "failed to read storage file {}: {error}",
                    path.display()
                )))
            }
        };
        let value = serde_json::from_slice(&bytes)
            .map_err(|error| CoreError::Internal(format!("storage parse error: {error}")))?;
        Ok(Some(value))
    }
}

fn validate_key(key: &str) -> CoreResult<()> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(CoreError::InvalidInput(format!(
            "invalid storage key {key}"
        )));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(CoreError::InvalidInput(format!(
            "invalid storage key {key}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_and_reads_json() {
        let dir = tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().join("data"));
        let value = serde_json::json!([{ "text": "hello", "timestamp": 1 }]);
        storage.write(&["history"], &value).await.expect("write");
        let loaded = storage
            .read(&["history"])
            .await
            .expect("read")
            .expect("value");
        assert_eq!(value, loaded);
        assert_eq!(entries_in(&dir.path().join("data")), vec!["history.json"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_never_share_a_staging_file() {
        let dir = tempdir().expect("tempdir");
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()));

        let writers: Vec<_> = (0..16)
            .map(|n| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    storage
                        .write(&["history"], &serde_json::json!([n]))
                        .await
                })
            })
            .collect();
        for writer in writers {
            writer.await.expect("join").expect("write");
        }

        let loaded = storage.read(&["history"]).await.expect("read").expect("value");
        assert_eq!(loaded.as_array().map(Vec::len), Some(1));
        assert_eq!(entries_in(dir.path()), vec!["history.json"]);
    }

    fn entries_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn missing_file_returns_none() {
        let dir = tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().join("never-created"));
        let loaded = storage.read(&["history"]).await.expect("read");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("history.json"), b"{oops").expect("seed");
        let storage = FileStorage::new(dir.path().to_path_buf());
        let err = storage.read(&["history"]).await.expect_err("parse error");
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[tokio::test]
    async fn overwrite_replaces_document() {
        let dir = tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf());
        storage
            .write(&["history"], &serde_json::json!([1, 2]))
            .await
            .expect("write");
        storage
            .write(&["history"], &serde_json::json!([]))
            .await
            .expect("overwrite");
        let loaded = storage.read(&["history"]).await.expect("read");
        assert_eq!(loaded, Some(serde_json::json!([])));
    }

    #[tokio::test]
    async fn invalid_key_rejected() {
        let dir = tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf());
        let value = serde_json::json!({ "ok": true });
        let err = storage
            .write(&["..", "bad"], &value)
            .await
            .expect_err("invalid key");
        match err {
            CoreError::InvalidInput(_) => {}
            _ => panic!("expected invalid input"),
        }
    }
}
