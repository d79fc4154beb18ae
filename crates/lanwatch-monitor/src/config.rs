//! Configuration for the lanwatch monitor daemon.

use std::time::Duration;

use ipnet::Ipv4Net;
use serde::Deserialize;

/// Top-level monitor configuration.
///
/// Loaded from `lanwatch.toml` `[monitor]` section or
/// `LANWATCH__MONITOR__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Address the HTTP and WebSocket API listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path of the persisted whitelist JSON array.
    #[serde(default = "default_whitelist_path")]
    pub whitelist_path: String,

    /// Period of scheduled discovery cycles, in seconds.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Ceiling on the neighbor-table dump of one cycle.
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_ms: u64,

    /// Ceiling on a single reverse name lookup.
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_ms: u64,

    /// Ceiling on each enforcement or hotspot command.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,

    /// Interface bounced by the disconnect workflow. Detected when unset.
    #[serde(default)]
    pub interface: Option<String>,

    /// Only neighbors inside this IPv4 network are reported.
    #[serde(default)]
    pub subnet: Option<Ipv4Net>,

    /// Events queued per observer before that observer starts dropping them.
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,
}

impl MonitorConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs.max(1))
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_whitelist_path() -> String {
    "whitelist.json".to_string()
}

fn default_scan_interval() -> u64 {
    5
}

fn default_discovery_timeout() -> u64 {
    4_000
}

fn default_resolve_timeout() -> u64 {
    2_000
}

fn default_command_timeout() -> u64 {
    5_000
}

fn default_observer_buffer() -> usize {
    32
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            whitelist_path: default_whitelist_path(),
            scan_interval_secs: default_scan_interval(),
            discovery_timeout_ms: default_discovery_timeout(),
            resolve_timeout_ms: default_resolve_timeout(),
            command_timeout_ms: default_command_timeout(),
            interface: None,
            subnet: None,
            observer_buffer: default_observer_buffer(),
        }
    }
}
