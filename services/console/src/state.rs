//! Believed device state shared between the poll loops and the push listener

use std::sync::Arc;

use tokio::sync::RwLock;

use doser_proto::{ClockSnapshot, MqttConfig, PumpConfig, PumpState, SystemStatus};

/// Firmware update progress, driven only by push frames.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpdateProgress {
    #[default]
    Idle,
    InProgress(u8),
    Error(String),
    Done,
}

/// A slice of the believed state, used to re-render only what changed.
///
/// Each slice is owned by exactly one source: pumps, clock, system and
/// MQTT config by their poll loops, update progress and pump badges by
/// push frames. A render triggered by one slice never reads another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    Pumps,
    Clock,
    Update,
    System,
    Mqtt,
}

/// The client's believed copy of device state.
///
/// Every slice is a cache, replaced wholesale on each successful fetch.
/// Pump activity badges live next to the config list but are never
/// touched by pump-list replacement.
#[derive(Debug, Default)]
pub struct SharedState {
    pub pumps: Vec<PumpConfig>,
    pub pump_states: Vec<PumpState>,
    pub clock: Option<ClockSnapshot>,
    pub update: UpdateProgress,
    pub system: Option<SystemStatus>,
    pub mqtt: Option<MqttConfig>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pump config list wholesale. Badges are preserved per
    /// index; the badge list is resized to match, new pumps defaulting to
    /// inactive.
    pub fn replace_pumps(&mut self, pumps: Vec<PumpConfig>) {
        self.pump_states.resize(pumps.len(), PumpState::Inactive);
        self.pumps = pumps;
    }

    pub fn replace_clock(&mut self, clock: ClockSnapshot) {
        self.clock = Some(clock);
    }

    pub fn replace_system(&mut self, system: SystemStatus) {
        self.system = Some(system);
    }

    pub fn replace_mqtt(&mut self, mqtt: MqttConfig) {
        self.mqtt = Some(mqtt);
    }

    /// Set one pump's activity badge by zero-based index. Returns false
    /// for indices outside the known pump list.
    pub fn set_pump_state(&mut self, index: usize, state: PumpState) -> bool {
        match self.pump_states.get_mut(index) {
            Some(slot) => {
                *slot = state;
                true
            }
            None => false,
        }
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle() -> StateHandle {
    Arc::new(RwLock::new(SharedState::new()))
}
