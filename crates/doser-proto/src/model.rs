//! REST payload types
//!
//! One type per endpoint shape, parsed defensively by the client. The
//! `/api/time` endpoint exists in two incompatible shapes across firmware
//! variants; both are kept as distinct versions and normalized into
//! [`ClockSnapshot`] rather than guessed into one schema.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::days::DayMask;

/// Configuration of a single pump.
///
/// Identity is positional: a pump is its index in the list returned by
/// `GET /api/pumps`. The whole list is replaced on every fetch and posted
/// wholesale on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpConfig {
    pub enabled: bool,
    /// Flow calibration in ml/s.
    pub calibration: f64,
    /// Dose volume in ml.
    pub dose: f64,
    /// Hour of day the dose runs, 0-23.
    pub schedule_hour: u8,
    pub schedule_days: DayMask,
}

/// Body of `GET`/`POST /api/pumps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpList {
    pub pumps: Vec<PumpConfig>,
}

/// Activity badge of a pump, pushed over the WebSocket. Independent of the
/// pump's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpState {
    Active,
    Inactive,
}

impl fmt::Display for PumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpState::Active => write!(f, "active"),
            PumpState::Inactive => write!(f, "inactive"),
        }
    }
}

/// Body of `GET`/`POST /api/mqtt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// Body of `GET /api/system`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub uptime: String,
    pub mqtt_connected: bool,
}

/// `GET /api/time`, version 1: preformatted display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeV1 {
    pub time: String,
    pub date: String,
    pub timezone: String,
}

/// `GET /api/time`, version 2: numeric fields plus DST flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeV2 {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
    #[serde(rename = "isDST")]
    pub is_dst: bool,
    #[serde(rename = "tzAbbrev")]
    pub tz_abbrev: String,
}

/// One clock reading, replaced wholesale on every poll tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockSnapshot {
    Formatted(TimeV1),
    Fields(TimeV2),
}

impl ClockSnapshot {
    pub fn time_text(&self) -> String {
        match self {
            ClockSnapshot::Formatted(t) => t.time.clone(),
            ClockSnapshot::Fields(t) => {
                format!("{:02}:{:02}:{:02}", t.hour, t.minute, t.second)
            }
        }
    }

    pub fn date_text(&self) -> String {
        match self {
            ClockSnapshot::Formatted(t) => t.date.clone(),
            ClockSnapshot::Fields(t) => format!("{:02}.{:02}.{}", t.day, t.month, t.year),
        }
    }

    pub fn timezone_text(&self) -> &str {
        match self {
            ClockSnapshot::Formatted(t) => &t.timezone,
            ClockSnapshot::Fields(t) => &t.tz_abbrev,
        }
    }
}
