//! Configuration types for the console service

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Which `/api/time` response shape the device speaks.
///
/// The two shapes are mutually incompatible across firmware variants and
/// are treated as distinct endpoint versions, never unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeApiVersion {
    V1,
    V2,
}

/// Where the device lives and how to talk to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    #[serde(default = "default_time_api")]
    pub time_api: TimeApiVersion,
}

impl DeviceConfig {
    /// Base URL for REST requests, no trailing slash.
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }

    /// URL of the push channel.
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/", self.host, self.ws_port)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            ws_port: default_ws_port(),
            time_api: default_time_api(),
        }
    }
}

/// Poll cadences. The three loops are scheduled independently and are not
/// aligned with each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(with = "humantime_serde", default = "default_clock_interval")]
    pub clock_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_pump_interval")]
    pub pump_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_system_interval")]
    pub system_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            clock_interval: default_clock_interval(),
            pump_interval: default_pump_interval(),
            system_interval: default_system_interval(),
        }
    }
}

/// Push-channel reconnection policy. With reconnection disabled, a
/// dropped channel stays down until restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(with = "humantime_serde", default = "default_initial_backoff")]
    pub initial_backoff: Duration,
    #[serde(with = "humantime_serde", default = "default_max_backoff")]
    pub max_backoff: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

fn default_host() -> String {
    "doser.local".to_string()
}

fn default_http_port() -> u16 {
    80
}

fn default_ws_port() -> u16 {
    81
}

fn default_time_api() -> TimeApiVersion {
    TimeApiVersion::V2
}

fn default_clock_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_pump_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_system_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

fn default_initial_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(30)
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::ConsoleError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
