//! Wire contract for the dosing controller.
//!
//! The device speaks two channels: a small JSON REST API and a WebSocket
//! push channel emitting colon-delimited text frames. This crate holds the
//! shared vocabulary for both - the push-frame grammar, the weekday
//! scheduling mask, and the REST payload types. No I/O lives here.

pub mod days;
pub mod frame;
pub mod model;

pub use days::{DayMask, DAY_LABELS};
pub use frame::{decode, PushFrame, SaveKind};
pub use model::{
    ClockSnapshot, MqttConfig, PumpConfig, PumpState, SystemStatus, TimeV1, TimeV2,
};
