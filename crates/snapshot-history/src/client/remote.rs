//! The client's view of the history HTTP API.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::snapshot::{decode_collection, SnapshotCollection};

const HISTORY_PATH: &str = "/api/history";

/// Result of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome<T> {
    /// The remote answered with a success status.
    Ok(T),
    /// The remote answered, but with a non-success status.
    Failed(u16),
    /// The remote could not be reached (connect error, timeout, broken body).
    Unreachable(String),
}

#[async_trait]
pub trait RemoteHistory: Send + Sync {
    async fn list(&self) -> RemoteOutcome<SnapshotCollection>;
    async fn append(&self, text: &str) -> RemoteOutcome<()>;
    async fn clear(&self) -> RemoteOutcome<()>;
}

/// [`RemoteHistory`] over HTTP with connect and request timeouts, so an
/// unreachable server fails fast.
#[derive(Debug, Clone)]
pub struct HttpHistoryRemote {
    client: reqwest::Client,
    history_url: String,
}

impl HttpHistoryRemote {
    pub fn new(base_url: &str, timeout: Duration) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            history_url: format!("{}{HISTORY_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub fn history_url(&self) -> &str {
        &self.history_url
    }

    async fn send_mutation(&self, request: reqwest::RequestBuilder) -> RemoteOutcome<()> {
        match request.send().await {
            Ok(response) if response.status().is_success() => RemoteOutcome::Ok(()),
            Ok(response) => RemoteOutcome::Failed(response.status().as_u16()),
            Err(error) => RemoteOutcome::Unreachable(error.to_string()),
        }
    }
}

#[async_trait]
impl RemoteHistory for HttpHistoryRemote {
    async fn list(&self) -> RemoteOutcome<SnapshotCollection> {
        let response = match self.client.get(&self.history_url).send().await {
            Ok(response) => response,
            Err(error) => return RemoteOutcome::Unreachable(error.to_string()),
        };
        let status = response.status();
        if !status.is_success() {
            return RemoteOutcome::Failed(status.as_u16());
        }
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(error) => return RemoteOutcome::Unreachable(error.to_string()),
        };
        // A reachable server with a garbled body still answered: empty history.
        let value = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|error| {
            tracing::warn!("remote history body is not JSON: {error}");
            Value::Null
        });
        RemoteOutcome::Ok(decode_collection(value))
    }

    async fn append(&self, text: &str) -> RemoteOutcome<()> {
        let request = self
            .client
            .post(&self.history_url)
            .json(&json!({ "text": text }));
        self.send_mutation(request).await
    }

    async fn clear(&self) -> RemoteOutcome<()> {
        let request = self.client.delete(&self.history_url);
        self.send_mutation(request).await
    }
}
