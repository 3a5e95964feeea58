use serde::Deserialize;
use std::path::Path;

use crate::store::StorageKind;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Upstream story feed, e.g. `https://example.com/worldnews`
    pub endpoint: String,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub kind: StorageKind,
}

fn default_database_url() -> String {
    "sqlite:global_upvote.db?mode=rwc".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            kind: StorageKind::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConnectivityConfig {
    /// Seconds between reachability probes
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_probe_interval() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    3
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
