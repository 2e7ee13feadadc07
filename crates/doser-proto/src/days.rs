//! Weekday scheduling mask
//!
//! A pump's schedule days travel over the wire as a 7-bit integer, bit `i`
//! set iff weekday `i` is active, with bit 0 = Sunday through bit 6 =
//! Saturday. Display order is fixed to the same Sunday-first sequence; the
//! labels and the bit assignment must never diverge.

use serde::{Deserialize, Serialize};

/// Day labels in bit order (bit 0 = Sunday .. bit 6 = Saturday).
pub const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A 7-day selection encoded as a bitmask.
///
/// Stray high bits are masked off on construction and on deserialization,
/// so every value round-trips within [0, 127].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct DayMask(u8);

impl DayMask {
    /// Every day of the week.
    pub const ALL: DayMask = DayMask(0x7f);

    /// No days.
    pub const NONE: DayMask = DayMask(0);

    pub fn new(bits: u8) -> Self {
        Self(bits & 0x7f)
    }

    /// The wire representation.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether weekday `day` (0 = Sunday .. 6 = Saturday) is active.
    pub fn contains(self, day: usize) -> bool {
        day < 7 && self.0 & (1 << day) != 0
    }

    /// Returns a copy with weekday `day` set or cleared. Days outside
    /// [0, 6] are ignored.
    #[must_use]
    pub fn with_day(self, day: usize, active: bool) -> Self {
        if day >= 7 {
            return self;
        }
        if active {
            Self(self.0 | (1 << day))
        } else {
            Self(self.0 & !(1 << day))
        }
    }

    /// Decode into per-day flags, Sunday first.
    pub fn days(self) -> [bool; 7] {
        let mut days = [false; 7];
        for (i, slot) in days.iter_mut().enumerate() {
            *slot = self.contains(i);
        }
        days
    }

    /// Encode per-day flags, Sunday first.
    pub fn from_days(days: [bool; 7]) -> Self {
        let mut bits = 0u8;
        for (i, active) in days.iter().enumerate() {
            if *active {
                bits |= 1 << i;
            }
        }
        Self(bits)
    }

    /// Labels of the active days, in the fixed Sunday-first order.
    pub fn active_labels(self) -> Vec<&'static str> {
        DAY_LABELS
            .iter()
            .enumerate()
            .filter(|(i, _)| self.contains(*i))
            .map(|(_, label)| *label)
            .collect()
    }
}

impl From<u8> for DayMask {
    fn from(bits: u8) -> Self {
        Self::new(bits)
    }
}

impl From<DayMask> for u8 {
    fn from(mask: DayMask) -> Self {
        mask.0
    }
}
