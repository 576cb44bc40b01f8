use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{CoreError, CoreResult};
use crate::history::{HistoryService, SnapshotFile};
use crate::storage::FileStorage;

pub mod error;
pub mod history;

const ALLOWED_METHODS: &str = "GET,POST,DELETE,OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

pub struct Server {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    history: HistoryService,
}

impl Server {
    /// Serves `<data_dir>/history.json` on the configured address.
    pub async fn start(config: &ServerConfig) -> CoreResult<Self> {
        let storage = Arc::new(FileStorage::new(config.data_dir.clone()));
        let file = SnapshotFile::new(storage).with_serialized_writes(config.serialize_writes);
        Self::with_service(config.socket_addr(), HistoryService::new(file)).await
    }

    pub async fn with_service(addr: SocketAddr, history: HistoryService) -> CoreResult<Self> {
        let app = router(history.clone());
        let listener = TcpListener::bind(addr).await.map_err(|error| {
            CoreError::Internal(format!("failed to bind {addr}: {error}"))
        })?;
        let addr = listener
            .local_addr()
            .map_err(|error| CoreError::Internal(error.to_string()))?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = result {
                tracing::error!("history server stopped: {error}");
            }
        });
        tracing::info!("history server listening on http://{addr}");

        Ok(Server {
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            history,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn history(&self) -> &HistoryService {
        &self.history
    }

    pub fn shutdown(&mut self) -> CoreResult<()> {
        if let Some(sender) = self.shutdown.take() {
            sender
                .send(())
                .map_err(|_| CoreError::Internal("failed to send server shutdown signal".to_string()))
        } else {
            Ok(())
        }
    }

    /// Signals shutdown and waits for in-flight requests to finish.
    pub async fn stop(mut self) -> CoreResult<()> {
        self.shutdown()?;
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|error| CoreError::Internal(format!("server task failed: {error}")))?;
        }
        tracing::info!("history server stopped");
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

pub(crate) struct ServerState {
    pub(crate) history: HistoryService,
}

/// The full HTTP surface, cross-origin headers included.
pub fn router(service: HistoryService) -> Router {
    let state = Arc::new(ServerState { history: service });
    Router::new()
        .route("/api/health", get(history::health).fallback(history::not_found))
        .route(
            "/api/history",
            get(history::list)
                .post(history::append)
                .delete(history::clear)
                .fallback(history::not_found),
        )
        .fallback(history::not_found)
        .with_state(state)
        // Captures can be arbitrarily large; no request body limit.
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(answer_preflight))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Any OPTIONS request gets an empty 204, whatever the path.
async fn answer_preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        return response;
    }
    next.run(request).await
}
