//! History API endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::history::Ack;
use crate::server::error::ApiError;
use crate::server::ServerState;
use crate::snapshot::SnapshotCollection;

/// GET /api/health
pub(crate) async fn health(State(state): State<Arc<ServerState>>) -> Json<Ack> {
    Json(state.history.health())
}

/// GET /api/history
#[tracing::instrument(skip_all)]
pub(crate) async fn list(State(state): State<Arc<ServerState>>) -> Json<SnapshotCollection> {
    Json(state.history.list().await)
}

/// POST /api/history
///
/// Body: `{ "text": string }`. Blank or missing text is rejected with 400.
#[tracing::instrument(skip_all)]
pub(crate) async fn append(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<Ack>, ApiError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|error| {
        tracing::debug!("rejecting malformed append body: {error}");
        ApiError::bad_request("bad request")
    })?;
    let text = text_field(&payload)?;
    state.history.append(&text).await?;
    Ok(Json(Ack::OK))
}

/// DELETE /api/history
#[tracing::instrument(skip_all)]
pub(crate) async fn clear(State(state): State<Arc<ServerState>>) -> Result<Json<Ack>, ApiError> {
    state.history.clear().await?;
    Ok(Json(Ack::OK))
}

pub(crate) async fn not_found() -> ApiError {
    ApiError::not_found()
}

/// Missing, null and falsy scalars read as empty text; other scalars are
/// taken in their string form. Structured values are malformed.
fn text_field(payload: &Value) -> Result<String, ApiError> {
    match payload.get("text") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Bool(true)) => Ok("true".to_string()),
        Some(Value::Number(number)) if number.as_f64() == Some(0.0) => Ok(String::new()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        // Refused rather than stringified and stored.
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(ApiError::bad_request("bad request")),
    }
}
