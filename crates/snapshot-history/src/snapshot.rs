//! The snapshot entity shared by both stores.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::utils::time::now_millis;

/// One captured select-all text with the time it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub text: String,
    /// Milliseconds since the Unix epoch, stamped by the store that wrote it.
    pub timestamp: u64,
}

/// Ordered history, oldest first.
pub type SnapshotCollection = Vec<Snapshot>;

impl Snapshot {
    /// Builds a snapshot stamped with the current clock. Blank text is rejected.
    pub fn capture(text: impl Into<String>) -> CoreResult<Self> {
        let text = text.into();
        validate_text(&text)?;
        Ok(Self {
            text,
            timestamp: now_millis(),
        })
    }
}

pub fn validate_text(text: &str) -> CoreResult<()> {
    if text.trim().is_empty() {
        return Err(CoreError::InvalidInput("empty text".to_string()));
    }
    Ok(())
}

/// Decodes a stored document into a collection. Anything that is not an array
/// of snapshots reads as empty history.
pub fn decode_collection(value: Value) -> SnapshotCollection {
    match value {
        Value::Array(_) => serde_json::from_value(value).unwrap_or_else(|error| {
            tracing::warn!("discarding malformed snapshot history: {error}");
            Vec::new()
        }),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!("snapshot history is not an array (found {})", kind_of(&other));
            Vec::new()
        }
    }
}

/// Same as [`decode_collection`] for raw text, as held by the local store.
pub fn decode_collection_str(raw: &str) -> SnapshotCollection {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => decode_collection(value),
        Err(error) => {
            tracing::warn!("snapshot history is not valid JSON: {error}");
            Vec::new()
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
