//! Renderer seam
//!
//! Rendering is a collaborator, not part of the synchronizer: every
//! method takes the full current value of one state slice and must be
//! idempotent and total. The default implementation writes tracing lines,
//! which is enough for headless operation and for tests.

use doser_proto::{ClockSnapshot, MqttConfig, PumpConfig, PumpState, SystemStatus};

use crate::notify::ActiveNotice;
use crate::state::{SharedState, Slice, UpdateProgress};

pub trait Renderer: Send + Sync {
    fn render_pumps(&self, pumps: &[PumpConfig], states: &[PumpState]);
    fn render_clock(&self, clock: &ClockSnapshot);
    fn render_update(&self, progress: &UpdateProgress);
    fn render_system(&self, status: &SystemStatus);
    fn render_mqtt(&self, config: &MqttConfig);
    fn render_notification(&self, notice: Option<&ActiveNotice>);
}

/// Re-render exactly one slice from the current state. Slices that have
/// no snapshot yet render nothing.
pub fn render_slice(state: &SharedState, slice: Slice, renderer: &dyn Renderer) {
    match slice {
        Slice::Pumps => renderer.render_pumps(&state.pumps, &state.pump_states),
        Slice::Clock => {
            if let Some(clock) = &state.clock {
                renderer.render_clock(clock);
            }
        }
        Slice::Update => renderer.render_update(&state.update),
        Slice::System => {
            if let Some(system) = &state.system {
                renderer.render_system(system);
            }
        }
        Slice::Mqtt => {
            if let Some(mqtt) = &state.mqtt {
                renderer.render_mqtt(mqtt);
            }
        }
    }
}

/// Renderer that writes state to the log.
#[derive(Debug, Default)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn render_pumps(&self, pumps: &[PumpConfig], states: &[PumpState]) {
        for (i, pump) in pumps.iter().enumerate() {
            let state = states
                .get(i)
                .copied()
                .unwrap_or(PumpState::Inactive);
            tracing::info!(
                "pump {}: {} [{}] {:.1} ml at {:02}:00 on {} (calibration {:.2} ml/s)",
                i + 1,
                if pump.enabled { "enabled" } else { "disabled" },
                state,
                pump.dose,
                pump.schedule_hour,
                pump.schedule_days.active_labels().join(","),
                pump.calibration,
            );
        }
    }

    fn render_clock(&self, clock: &ClockSnapshot) {
        tracing::info!(
            "device clock {} {} {}",
            clock.time_text(),
            clock.date_text(),
            clock.timezone_text()
        );
    }

    fn render_update(&self, progress: &UpdateProgress) {
        match progress {
            UpdateProgress::Idle => tracing::debug!("no firmware update in progress"),
            UpdateProgress::InProgress(percent) => {
                tracing::info!("firmware update: {}%", percent);
            }
            UpdateProgress::Error(message) => {
                tracing::warn!("firmware update failed: {}", message);
            }
            UpdateProgress::Done => tracing::info!("firmware update complete"),
        }
    }

    fn render_system(&self, status: &SystemStatus) {
        tracing::info!(
            "uptime {}, MQTT {}",
            status.uptime,
            if status.mqtt_connected {
                "connected"
            } else {
                "disconnected"
            }
        );
    }

    fn render_mqtt(&self, config: &MqttConfig) {
        tracing::info!("MQTT broker {}:{} as '{}'", config.server, config.port, config.user);
    }

    fn render_notification(&self, notice: Option<&ActiveNotice>) {
        match notice {
            Some(active) if !active.fading => {
                tracing::info!("[{:?}] {}", active.notice.kind, active.notice.text);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// What a renderer was asked to draw, in order.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Rendered {
        Pumps(Vec<PumpConfig>, Vec<PumpState>),
        Clock(String),
        Update(UpdateProgress),
        System(SystemStatus),
        Mqtt(MqttConfig),
        Notification(Option<ActiveNotice>),
    }

    #[derive(Debug, Default)]
    pub struct RecordingRenderer {
        events: Mutex<Vec<Rendered>>,
    }

    impl RecordingRenderer {
        pub fn events(&self) -> Vec<Rendered> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: Rendered) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Renderer for RecordingRenderer {
        fn render_pumps(&self, pumps: &[PumpConfig], states: &[PumpState]) {
            self.push(Rendered::Pumps(pumps.to_vec(), states.to_vec()));
        }

        fn render_clock(&self, clock: &ClockSnapshot) {
            self.push(Rendered::Clock(clock.time_text()));
        }

        fn render_update(&self, progress: &UpdateProgress) {
            self.push(Rendered::Update(progress.clone()));
        }

        fn render_system(&self, status: &SystemStatus) {
            self.push(Rendered::System(status.clone()));
        }

        fn render_mqtt(&self, config: &MqttConfig) {
            self.push(Rendered::Mqtt(config.clone()));
        }

        fn render_notification(&self, notice: Option<&ActiveNotice>) {
            self.push(Rendered::Notification(notice.cloned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{Rendered, RecordingRenderer};
    use super::*;
    use doser_proto::{DayMask, TimeV1};

    #[test]
    fn render_slice_draws_only_the_requested_slice() {
        let renderer = RecordingRenderer::default();
        let mut state = SharedState::new();
        state.replace_pumps(vec![PumpConfig {
            enabled: true,
            calibration: 1.0,
            dose: 2.0,
            schedule_hour: 9,
            schedule_days: DayMask::ALL,
        }]);
        state.replace_clock(ClockSnapshot::Formatted(TimeV1 {
            time: "10:00:00".to_string(),
            date: "01.01.2026".to_string(),
            timezone: "CET".to_string(),
        }));

        render_slice(&state, Slice::Clock, &renderer);

        assert_eq!(renderer.events(), vec![Rendered::Clock("10:00:00".to_string())]);
    }

    #[test]
    fn render_slice_skips_absent_snapshots() {
        let renderer = RecordingRenderer::default();
        let state = SharedState::new();

        render_slice(&state, Slice::Clock, &renderer);
        render_slice(&state, Slice::System, &renderer);
        render_slice(&state, Slice::Mqtt, &renderer);

        assert!(renderer.events().is_empty());
    }

    #[test]
    fn render_slice_update_is_total() {
        let renderer = RecordingRenderer::default();
        let state = SharedState::new();

        render_slice(&state, Slice::Update, &renderer);

        assert_eq!(renderer.events(), vec![Rendered::Update(UpdateProgress::Idle)]);
    }
}
