//! Command-line front end over [`SnapshotClient`].
//!
//! Talks to the history server and falls back to the local store when the
//! server is down, exactly like any other client of the library.

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

use snapshot_history::utils::time::format_millis;
use snapshot_history::{ChangeEvent, ClientConfig, SnapshotClient, StoreKind};

#[derive(Parser)]
#[command(name = "snapshots")]
#[command(about = "Record, list and clear select-all text snapshots")]
#[command(version)]
struct Cli {
    /// Base URL of the history server (overrides HISTORY_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Local fallback store file (overrides HISTORY_LOCAL_STORE)
    #[arg(long, global = true)]
    local_store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a snapshot; reads stdin when no text is given
    Append {
        text: Vec<String>,
    },

    /// Print the snapshot history, oldest first
    List {
        /// Output as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Delete every snapshot
    Clear,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    snapshot_history::init_tracing();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(local_store) = cli.local_store {
        config.local_store = local_store;
    }

    let client = match SnapshotClient::from_config(&config) {
        Ok(client) => client,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };
    client.subscribe(report_change);

    match cli.command {
        Command::Append { text } => {
            let text = if text.is_empty() {
                let mut buffer = String::new();
                if let Err(error) = std::io::stdin().read_to_string(&mut buffer) {
                    eprintln!("error: failed to read stdin: {error}");
                    std::process::exit(1);
                }
                buffer
            } else {
                text.join(" ")
            };
            client.append(&text).await;
        }
        Command::List { json } => {
            let snapshots = client.list().await;
            if json {
                match serde_json::to_string_pretty(&snapshots) {
                    Ok(output) => println!("{output}"),
                    Err(error) => {
                        eprintln!("error: {error}");
                        std::process::exit(1);
                    }
                }
            } else if snapshots.is_empty() {
                println!("no snapshots");
            } else {
                for (index, snapshot) in snapshots.iter().enumerate() {
                    println!(
                        "{:>4}  {}  {}",
                        index + 1,
                        format_millis(snapshot.timestamp),
                        preview(&snapshot.text)
                    );
                }
            }
        }
        Command::Clear => client.clear().await,
    }
}

fn report_change(event: &ChangeEvent) {
    let store = match event.store {
        StoreKind::Remote => "server",
        StoreKind::Local => "local store",
    };
    eprintln!("{} ({:?} via {store})", event.name(), event.kind);
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 72;
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() > MAX_CHARS {
        let cut: String = flat.chars().take(MAX_CHARS - 1).collect();
        format!("{cut}…")
    } else {
        flat
    }
}
