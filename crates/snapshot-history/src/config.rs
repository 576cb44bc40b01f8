//! Environment-driven settings for the server and the client.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8787;
const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_DATA_DIR: &str = "server/data";
const DEFAULT_API_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_TIMEOUT_MS: u64 = 2000;
const LOCAL_STORE_DIR: &str = "snapshot-history";
const LOCAL_STORE_FILE: &str = "local-storage.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub serialize_writes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            serialize_writes: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let host = parse_var(&lookup, "API_HOST").unwrap_or(defaults.host);
        let port = parse_var(&lookup, "API_PORT").unwrap_or(defaults.port);
        let data_dir = non_empty_var(&lookup, "HISTORY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let serialize_writes =
            bool_var(&lookup, "HISTORY_SERIALIZE_WRITES").unwrap_or(defaults.serialize_writes);

        Self {
            host,
            port,
            data_dir,
            serialize_writes,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// What the client does when the remote answers with a non-success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// A reachable remote is authoritative, whatever its status.
    #[default]
    OnlyWhenUnreachable,
    /// Error statuses are treated like an unreachable remote.
    OnErrorStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub fallback: FallbackPolicy,
    pub local_store: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            fallback: FallbackPolicy::default(),
            local_store: default_local_store_path(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let api_url = non_empty_var(&lookup, "HISTORY_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        let timeout = parse_var::<u64>(&lookup, "HISTORY_API_TIMEOUT_MS")
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);
        let fallback = match bool_var(&lookup, "HISTORY_FALLBACK_ON_ERROR_STATUS") {
            Some(true) => FallbackPolicy::OnErrorStatus,
            Some(false) => FallbackPolicy::OnlyWhenUnreachable,
            None => defaults.fallback,
        };
        let local_store = non_empty_var(&lookup, "HISTORY_LOCAL_STORE")
            .map(PathBuf::from)
            .unwrap_or(defaults.local_store);

        Self {
            api_url,
            timeout,
            fallback,
            local_store,
        }
    }
}

pub fn default_local_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LOCAL_STORE_DIR)
        .join(LOCAL_STORE_FILE)
}

fn non_empty_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = non_empty_var(lookup, name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring invalid {name}={raw}");
            None
        }
    }
}

fn bool_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    let raw = non_empty_var(lookup, name)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("ignoring invalid {name}={raw}");
            None
        }
    }
}
