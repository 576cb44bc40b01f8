//! Serves the snapshot history API.
//!
//! Usage: `cargo run --bin history-server` (honours `API_PORT`, `API_HOST`,
//! `HISTORY_DATA_DIR`, `HISTORY_SERIALIZE_WRITES`).

use snapshot_history::server::Server;
use snapshot_history::ServerConfig;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    snapshot_history::init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(
        data_dir = %config.data_dir.display(),
        serialize_writes = config.serialize_writes,
        "starting history server"
    );

    let server = match Server::start(&config).await {
        Ok(server) => server,
        Err(error) => {
            tracing::error!("failed to start history server: {error}");
            std::process::exit(1);
        }
    };

    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("cannot listen for ctrl-c: {error}");
    }
    tracing::info!("shutting down");
    if let Err(error) = server.stop().await {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}
