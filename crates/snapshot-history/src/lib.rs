pub mod server;

pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod snapshot;
pub mod storage;
pub mod utils;

pub use crate::client::{ChangeEvent, ChangeKind, SnapshotClient, StoreKind};
pub use crate::config::{ClientConfig, FallbackPolicy, ServerConfig};
pub use crate::error::{CoreError, CoreResult};
pub use crate::history::HistoryService;
pub use crate::snapshot::{Snapshot, SnapshotCollection};

/// Installs the `tracing` fmt subscriber used by the binaries. `RUST_LOG`
/// overrides the default `info` filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
