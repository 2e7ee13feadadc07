//! Typed reads from the device's REST API
//!
//! Every fetch is an idempotent snapshot read. Failures - network errors,
//! non-2xx statuses, payloads that do not parse - yield `None` and a log
//! line; the caller keeps its previous snapshot and the next poll tick is
//! the retry.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use doser_proto::model::PumpList;
use doser_proto::{ClockSnapshot, MqttConfig, PumpConfig, SystemStatus, TimeV1, TimeV2};

use crate::config::{DeviceConfig, TimeApiVersion};
use crate::io::HttpClient;

/// Client for the dosing controller's REST API
pub struct DeviceClient {
    base_url: String,
    time_api: TimeApiVersion,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for DeviceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("base_url", &self.base_url)
            .field("time_api", &self.time_api)
            .finish()
    }
}

impl DeviceClient {
    pub fn new(config: &DeviceConfig, http: Arc<dyn HttpClient>) -> Self {
        let base_url = config.http_base();
        tracing::debug!("Created DeviceClient for {}", base_url);
        Self {
            base_url,
            time_api: config.time_api,
            http,
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = format!("{}{}", self.base_url, path);
        match self.http.get(&url).await {
            Ok(response) => {
                if !response.is_success() {
                    tracing::debug!("GET {} returned status {}", path, response.status);
                    return None;
                }
                match serde_json::from_str::<T>(&response.body) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        tracing::debug!("Failed to parse response from {}: {}", path, e);
                        None
                    }
                }
            }
            Err(e) => {
                tracing::debug!("GET {} failed: {}", path, e);
                None
            }
        }
    }

    /// Fetch the full pump configuration list.
    pub async fn fetch_pumps(&self) -> Option<Vec<PumpConfig>> {
        self.fetch_json::<PumpList>("/api/pumps")
            .await
            .map(|list| list.pumps)
    }

    /// Fetch the MQTT broker settings.
    pub async fn fetch_mqtt(&self) -> Option<MqttConfig> {
        self.fetch_json::<MqttConfig>("/api/mqtt").await
    }

    /// Fetch uptime and broker connection status.
    pub async fn fetch_system(&self) -> Option<SystemStatus> {
        self.fetch_json::<SystemStatus>("/api/system").await
    }

    /// Fetch the device clock, using the configured endpoint version.
    pub async fn fetch_clock(&self) -> Option<ClockSnapshot> {
        match self.time_api {
            TimeApiVersion::V1 => self
                .fetch_json::<TimeV1>("/api/time")
                .await
                .map(ClockSnapshot::Formatted),
            TimeApiVersion::V2 => self
                .fetch_json::<TimeV2>("/api/time")
                .await
                .map(ClockSnapshot::Fields),
        }
    }
}
