//! Server configuration.
//!
//! Built once at startup from the command line and passed by reference into
//! document loading, routing and serving.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Where the API document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    /// A local YAML or JSON file
    Path(PathBuf),
    /// A URL fetched once at startup
    Url(String),
}

impl SpecSource {
    /// Choose a source from optional CLI values. A path is preferred over a URL.
    pub fn from_options(path: Option<PathBuf>, url: Option<String>) -> Option<Self> {
        match (path, url) {
            (Some(path), _) => Some(Self::Path(path)),
            (None, Some(url)) => Some(Self::Url(url)),
            (None, None) => None,
        }
    }
}

/// Main configuration for the mock server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `:3000` or `127.0.0.1:8080`
    pub listen_addr: String,

    /// Upper bound for a requested `X-Mock-Latency`
    pub max_latency: Duration,

    /// Upper bound for a requested `X-Mock-Count`
    pub max_item_count: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_latency: Duration::from_millis(DEFAULT_MAX_LATENCY_MS),
            max_item_count: DEFAULT_MAX_ITEM_COUNT,
        }
    }
}

pub const DEFAULT_MAX_LATENCY_MS: u64 = 60_000;
pub const DEFAULT_MAX_ITEM_COUNT: i64 = 10_000;

fn default_listen_addr() -> String {
    ":3000".to_string()
}

impl ServerConfig {
    /// Resolve the listen address. A bare `:port` listens on all interfaces.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = if self.listen_addr.starts_with(':') {
            format!("0.0.0.0{}", self.listen_addr)
        } else {
            self.listen_addr.clone()
        };
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {:?}: {}", self.listen_addr, e))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.socket_addr()?;
        if self.max_item_count < 1 {
            anyhow::bail!("max item count must be at least 1, got {}", self.max_item_count);
        }
        Ok(())
    }
}
