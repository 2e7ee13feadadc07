//! Command dispatcher: user actions become REST calls
//!
//! One call per action, never retried - a failed write is terminal until
//! the user triggers it again. Pump edits patch the local cache first and
//! then post the entire pump list; the device treats the last array to
//! arrive as the truth, so two sessions editing at once clobber each
//! other. That race is inherited from the device API, not worked around
//! here.

use std::sync::Arc;

use doser_proto::model::PumpList;
use doser_proto::{MqttConfig, PumpConfig};

use crate::engine::Resync;
use crate::io::HttpClient;
use crate::notify::{Notice, NotificationCenter};
use crate::state::StateHandle;

const PUMP_SAVE_FAILED: &str = "Saving pump configuration failed";
const MQTT_SAVE_FAILED: &str = "Saving MQTT configuration failed";
const PUMP_TEST_FAILED: &str = "Pump test failed";
const REBOOT_FAILED: &str = "Reboot failed";
const FACTORY_RESET_FAILED: &str = "Factory reset failed";

/// Dispatches user actions against the device API.
pub struct Dispatcher {
    base_url: String,
    http: Arc<dyn HttpClient>,
    state: StateHandle,
    notices: Arc<NotificationCenter>,
    resync: Resync,
}

impl Dispatcher {
    pub fn new(
        base_url: String,
        http: Arc<dyn HttpClient>,
        state: StateHandle,
        notices: Arc<NotificationCenter>,
        resync: Resync,
    ) -> Self {
        Self {
            base_url,
            http,
            state,
            notices,
            resync,
        }
    }

    /// Patch one pump with `edit`, then post the full pump list. Unknown
    /// indices are logged and dropped without a request.
    async fn edit_pump<F>(&self, index: usize, edit: F)
    where
        F: FnOnce(&mut PumpConfig),
    {
        let pumps = {
            let mut state = self.state.write().await;
            match state.pumps.get_mut(index) {
                Some(pump) => {
                    edit(pump);
                    state.pumps.clone()
                }
                None => {
                    tracing::warn!("edit for unknown pump index {}", index);
                    return;
                }
            }
        };
        self.post_pumps(pumps).await;
    }

    async fn post_pumps(&self, pumps: Vec<PumpConfig>) {
        let body = match serde_json::to_value(PumpList { pumps }) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("failed to encode pump list: {}", e);
                return;
            }
        };
        let url = format!("{}/api/pumps", self.base_url);
        match self.http.post_json(&url, body).await {
            Ok(response) if response.is_success() => {
                // Silent success; the device pushes a save: frame when it
                // wants one surfaced.
            }
            Ok(response) => {
                tracing::warn!("POST /api/pumps returned status {}", response.status);
                self.notices.show(Notice::error(PUMP_SAVE_FAILED)).await;
            }
            Err(e) => {
                tracing::warn!("POST /api/pumps failed: {}", e);
                self.notices.show(Notice::error(PUMP_SAVE_FAILED)).await;
            }
        }
    }

    pub async fn set_pump_enabled(&self, index: usize, enabled: bool) {
        self.edit_pump(index, |pump| pump.enabled = enabled).await;
    }

    pub async fn set_pump_calibration(&self, index: usize, calibration: f64) {
        self.edit_pump(index, |pump| pump.calibration = calibration)
            .await;
    }

    pub async fn set_pump_dose(&self, index: usize, dose: f64) {
        self.edit_pump(index, |pump| pump.dose = dose).await;
    }

    pub async fn set_pump_hour(&self, index: usize, hour: u8) {
        self.edit_pump(index, |pump| pump.schedule_hour = hour).await;
    }

    /// Toggle one weekday (0 = Sunday .. 6 = Saturday) of one pump.
    pub async fn set_pump_day(&self, index: usize, day: usize, active: bool) {
        self.edit_pump(index, |pump| {
            pump.schedule_days = pump.schedule_days.with_day(day, active);
        })
        .await;
    }

    pub async fn set_pump_days(&self, index: usize, days: doser_proto::DayMask) {
        self.edit_pump(index, |pump| pump.schedule_days = days).await;
    }

    /// Save MQTT broker settings. Success confirmation, if any, arrives
    /// as a `save:` push frame.
    pub async fn save_mqtt(&self, config: MqttConfig) {
        let body = match serde_json::to_value(&config) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("failed to encode MQTT config: {}", e);
                return;
            }
        };

        self.state.write().await.replace_mqtt(config);

        let url = format!("{}/api/mqtt", self.base_url);
        match self.http.post_json(&url, body).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => {
                tracing::warn!("POST /api/mqtt returned status {}", response.status);
                self.notices.show(Notice::error(MQTT_SAVE_FAILED)).await;
            }
            Err(e) => {
                tracing::warn!("POST /api/mqtt failed: {}", e);
                self.notices.show(Notice::error(MQTT_SAVE_FAILED)).await;
            }
        }
    }

    /// Legacy firmware variant of the MQTT save: multipart form fields,
    /// no response body guaranteed.
    pub async fn save_mqtt_form(&self, config: &MqttConfig) {
        let port = config.port.to_string();
        let fields = [
            ("server", config.server.as_str()),
            ("port", port.as_str()),
            ("user", config.user.as_str()),
            ("password", config.password.as_str()),
        ];
        let url = format!("{}/save-mqtt", self.base_url);
        if !self.post_form_checked(&url, &fields).await {
            self.notices.show(Notice::error(MQTT_SAVE_FAILED)).await;
        }
    }

    /// Legacy firmware variant of the pump save: one multipart field per
    /// pump setting, keyed by pump index.
    pub async fn save_pumps_form(&self) {
        let pumps = self.state.read().await.pumps.clone();
        let mut fields = Vec::new();
        for (i, pump) in pumps.iter().enumerate() {
            fields.push((format!("pump{}_enabled", i), pump.enabled.to_string()));
            fields.push((format!("pump{}_calibration", i), pump.calibration.to_string()));
            fields.push((format!("pump{}_dose", i), pump.dose.to_string()));
            fields.push((format!("pump{}_hour", i), pump.schedule_hour.to_string()));
            fields.push((format!("pump{}_days", i), pump.schedule_days.bits().to_string()));
        }
        let borrowed: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let url = format!("{}/save-pumps", self.base_url);
        if !self.post_form_checked(&url, &borrowed).await {
            self.notices.show(Notice::error(PUMP_SAVE_FAILED)).await;
        }
    }

    /// Legacy combined save: everything the console currently believes,
    /// posted to `/save` in one multipart body.
    pub async fn save_all_form(&self) {
        let (pumps, mqtt) = {
            let state = self.state.read().await;
            (state.pumps.clone(), state.mqtt.clone())
        };

        let mut fields = Vec::new();
        if let Some(mqtt) = &mqtt {
            fields.push(("server".to_string(), mqtt.server.clone()));
            fields.push(("port".to_string(), mqtt.port.to_string()));
            fields.push(("user".to_string(), mqtt.user.clone()));
            fields.push(("password".to_string(), mqtt.password.clone()));
        }
        for (i, pump) in pumps.iter().enumerate() {
            fields.push((format!("pump{}_enabled", i), pump.enabled.to_string()));
            fields.push((format!("pump{}_calibration", i), pump.calibration.to_string()));
            fields.push((format!("pump{}_dose", i), pump.dose.to_string()));
            fields.push((format!("pump{}_hour", i), pump.schedule_hour.to_string()));
            fields.push((format!("pump{}_days", i), pump.schedule_days.bits().to_string()));
        }
        let borrowed: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let url = format!("{}/save", self.base_url);
        if !self.post_form_checked(&url, &borrowed).await {
            self.notices.show(Notice::error(PUMP_SAVE_FAILED)).await;
        }
    }

    /// Trigger a manual dose on one pump (1-based id, as on the wire).
    pub async fn test_pump(&self, id: usize) {
        let url = format!("{}/test-pump/{}", self.base_url, id);
        if !self.post_checked(&url).await {
            self.notices.show(Notice::error(PUMP_TEST_FAILED)).await;
        }
    }

    /// Reboot the device. Acceptance schedules the delayed resync.
    pub async fn reboot(&self) {
        let url = format!("{}/reboot", self.base_url);
        if self.post_checked(&url).await {
            self.resync.schedule();
        } else {
            self.notices.show(Notice::error(REBOOT_FAILED)).await;
        }
    }

    /// Restore factory defaults. Acceptance schedules the delayed resync.
    pub async fn factory_reset(&self) {
        let url = format!("{}/factory-reset", self.base_url);
        if self.post_checked(&url).await {
            self.resync.schedule();
        } else {
            self.notices.show(Notice::error(FACTORY_RESET_FAILED)).await;
        }
    }

    async fn post_checked(&self, url: &str) -> bool {
        match self.http.post(url).await {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                tracing::warn!("POST {} returned status {}", url, response.status);
                false
            }
            Err(e) => {
                tracing::warn!("POST {} failed: {}", url, e);
                false
            }
        }
    }

    async fn post_form_checked(&self, url: &str, fields: &[(&str, &str)]) -> bool {
        match self.http.post_multipart(url, fields).await {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                tracing::warn!("POST {} returned status {}", url, response.status);
                false
            }
            Err(e) => {
                tracing::warn!("POST {} failed: {}", url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};
    use crate::notify::NoticeKind;
    use crate::render::test_support::RecordingRenderer;
    use crate::render::Renderer;
    use crate::state::new_state_handle;
    use doser_proto::DayMask;

    fn pump(dose: f64) -> PumpConfig {
        PumpConfig {
            enabled: false,
            calibration: 1.0,
            dose,
            schedule_hour: 8,
            schedule_days: DayMask::NONE,
        }
    }

    fn ok_response() -> crate::Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            body: String::new(),
        })
    }

    async fn dispatcher_with(
        mock: MockHttpClient,
        pumps: Vec<PumpConfig>,
    ) -> (Dispatcher, StateHandle, Arc<NotificationCenter>) {
        let state = new_state_handle();
        state.write().await.replace_pumps(pumps);
        let renderer: Arc<dyn Renderer> = Arc::new(RecordingRenderer::default());
        let notices = Arc::new(NotificationCenter::new(renderer));
        let dispatcher = Dispatcher::new(
            "http://doser.test:80".to_string(),
            Arc::new(mock),
            Arc::clone(&state),
            Arc::clone(&notices),
            Resync::disabled(),
        );
        (dispatcher, state, notices)
    }

    #[tokio::test]
    async fn pump_edit_posts_the_full_list() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|url, body| {
                url == "http://doser.test:80/api/pumps"
                    && body["pumps"].as_array().unwrap().len() == 2
                    && body["pumps"][1]["enabled"] == serde_json::json!(true)
                    && body["pumps"][0]["enabled"] == serde_json::json!(false)
            })
            .times(1)
            .returning(|_, _| Box::pin(async { ok_response() }));

        let (dispatcher, state, _) = dispatcher_with(mock, vec![pump(1.0), pump(2.0)]).await;
        dispatcher.set_pump_enabled(1, true).await;

        // optimistic local patch
        assert!(state.read().await.pumps[1].enabled);
    }

    #[tokio::test]
    async fn second_edit_sends_both_changes() {
        // Each edit posts the complete current array, so the second body
        // carries the first edit too - last write wins on the device.
        let mut mock = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_post_json()
            .withf(|_, body| {
                body["pumps"][0]["enabled"] == serde_json::json!(true)
                    && body["pumps"][0]["dose"] == serde_json::json!(1.0)
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Box::pin(async { ok_response() }));
        mock.expect_post_json()
            .withf(|_, body| {
                body["pumps"][0]["enabled"] == serde_json::json!(true)
                    && body["pumps"][0]["dose"] == serde_json::json!(9.5)
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Box::pin(async { ok_response() }));

        let (dispatcher, _, _) = dispatcher_with(mock, vec![pump(1.0)]).await;
        dispatcher.set_pump_enabled(0, true).await;
        dispatcher.set_pump_dose(0, 9.5).await;
    }

    #[tokio::test]
    async fn pump_edit_out_of_range_sends_nothing() {
        let mock = MockHttpClient::new(); // no expectations: any call panics
        let (dispatcher, state, _) = dispatcher_with(mock, vec![pump(1.0)]).await;

        dispatcher.set_pump_dose(5, 2.0).await;

        assert_eq!(state.read().await.pumps[0].dose, 1.0);
    }

    #[tokio::test]
    async fn failed_pump_save_surfaces_error_notice() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 500,
                    body: String::new(),
                })
            })
        });

        let (dispatcher, _, notices) = dispatcher_with(mock, vec![pump(1.0)]).await;
        dispatcher.set_pump_dose(0, 3.0).await;

        let active = notices.current().await.unwrap();
        assert_eq!(active.notice.kind, NoticeKind::Error);
        assert_eq!(active.notice.text, PUMP_SAVE_FAILED);
    }

    #[tokio::test]
    async fn successful_pump_save_is_silent() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .returning(|_, _| Box::pin(async { ok_response() }));

        let (dispatcher, _, notices) = dispatcher_with(mock, vec![pump(1.0)]).await;
        dispatcher.set_pump_dose(0, 3.0).await;

        assert!(notices.current().await.is_none());
    }

    #[tokio::test]
    async fn day_toggle_flips_one_bit() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|_, body| body["pumps"][0]["schedule_days"] == serde_json::json!(0b100))
            .times(1)
            .returning(|_, _| Box::pin(async { ok_response() }));

        let (dispatcher, state, _) = dispatcher_with(mock, vec![pump(1.0)]).await;
        dispatcher.set_pump_day(0, 2, true).await;

        assert!(state.read().await.pumps[0].schedule_days.contains(2));
    }

    #[tokio::test]
    async fn save_mqtt_posts_config_and_patches_cache() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|url, body| {
                url == "http://doser.test:80/api/mqtt" && body["server"] == "broker.lan"
            })
            .times(1)
            .returning(|_, _| Box::pin(async { ok_response() }));

        let (dispatcher, state, notices) = dispatcher_with(mock, vec![]).await;
        dispatcher
            .save_mqtt(MqttConfig {
                server: "broker.lan".to_string(),
                port: 1883,
                user: "doser".to_string(),
                password: "secret".to_string(),
            })
            .await;

        assert_eq!(state.read().await.mqtt.as_ref().unwrap().server, "broker.lan");
        assert!(notices.current().await.is_none());
    }

    #[tokio::test]
    async fn save_mqtt_form_uses_multipart_fields() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_multipart()
            .withf(|url, fields| {
                url == "http://doser.test:80/save-mqtt"
                    && fields.contains(&("server", "broker.lan"))
                    && fields.contains(&("port", "1883"))
            })
            .times(1)
            .returning(|_, _| Box::pin(async { ok_response() }));

        let (dispatcher, _, _) = dispatcher_with(mock, vec![]).await;
        dispatcher
            .save_mqtt_form(&MqttConfig {
                server: "broker.lan".to_string(),
                port: 1883,
                user: "doser".to_string(),
                password: "secret".to_string(),
            })
            .await;
    }

    #[tokio::test]
    async fn save_pumps_form_flattens_each_pump() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_multipart()
            .withf(|url, fields| {
                url == "http://doser.test:80/save-pumps"
                    && fields.contains(&("pump0_dose", "1"))
                    && fields.contains(&("pump1_dose", "2"))
                    && fields.contains(&("pump1_days", "0"))
            })
            .times(1)
            .returning(|_, _| Box::pin(async { ok_response() }));

        let (dispatcher, _, _) = dispatcher_with(mock, vec![pump(1.0), pump(2.0)]).await;
        dispatcher.save_pumps_form().await;
    }

    #[tokio::test]
    async fn save_all_form_includes_mqtt_and_pumps() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_multipart()
            .withf(|url, fields| {
                url == "http://doser.test:80/save"
                    && fields.contains(&("server", "broker.lan"))
                    && fields.contains(&("pump0_enabled", "false"))
            })
            .times(1)
            .returning(|_, _| Box::pin(async { ok_response() }));

        let (dispatcher, state, _) = dispatcher_with(mock, vec![pump(1.0)]).await;
        state.write().await.replace_mqtt(MqttConfig {
            server: "broker.lan".to_string(),
            port: 1883,
            user: "doser".to_string(),
            password: "secret".to_string(),
        });
        dispatcher.save_all_form().await;
    }

    #[tokio::test]
    async fn test_pump_posts_to_its_id() {
        let mut mock = MockHttpClient::new();
        mock.expect_post()
            .withf(|url| url == "http://doser.test:80/test-pump/2")
            .times(1)
            .returning(|_| Box::pin(async { ok_response() }));

        let (dispatcher, _, notices) = dispatcher_with(mock, vec![]).await;
        dispatcher.test_pump(2).await;
        assert!(notices.current().await.is_none());
    }

    #[tokio::test]
    async fn failed_test_pump_surfaces_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_post().returning(|_| {
            Box::pin(async { Err(crate::ConsoleError::Http("unreachable".to_string())) })
        });

        let (dispatcher, _, notices) = dispatcher_with(mock, vec![]).await;
        dispatcher.test_pump(1).await;

        let active = notices.current().await.unwrap();
        assert_eq!(active.notice.text, PUMP_TEST_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_reboot_schedules_resync() {
        let mut mock = MockHttpClient::new();
        mock.expect_post()
            .withf(|url| url.ends_with("/reboot"))
            .returning(|_| Box::pin(async { ok_response() }));

        let state = new_state_handle();
        let renderer: Arc<dyn Renderer> = Arc::new(RecordingRenderer::default());
        let notices = Arc::new(NotificationCenter::new(renderer));
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let dispatcher = Dispatcher::new(
            "http://doser.test:80".to_string(),
            Arc::new(mock),
            state,
            notices,
            Resync::with_sender(tx),
        );

        dispatcher.reboot().await;

        tokio::time::sleep(crate::engine::RELOAD_DELAY + Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_ok());
    }
}
