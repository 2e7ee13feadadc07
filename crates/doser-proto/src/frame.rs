//! Push-frame grammar for the device's WebSocket channel
//!
//! Frames are UTF-8 text: a type tag terminated by `:`, then a payload.
//! Recognized frames:
//!
//! - `update:<percent>` - firmware update progress, integer 0-100
//! - `update:error:<message>` - update failure; the message is opaque
//!   remainder text and may itself contain `:`
//! - `save:<kind>:<text>` - save confirmation; kind is `success` or
//!   `error`, the text is opaque remainder
//! - `pump:<id>:<state>` - a pump's activity badge; id is a 1-based
//!   numeric index, state is `active` or `inactive`
//!
//! Anything else decodes to [`PushFrame::Unknown`] so that newer firmware
//! can add frame types without breaking older consumers. Malformed
//! payloads under a recognized tag are treated the same way - a bad frame
//! is never an error, it is just not an instruction.

use crate::model::PumpState;

/// A decoded push frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    /// Firmware update progress.
    Update { percent: u8 },
    /// Device-reported update failure; message surfaced verbatim.
    UpdateError { message: String },
    /// Save confirmation to surface as a notification.
    Save { kind: SaveKind, text: String },
    /// A pump's activity badge changed.
    Pump { id: usize, state: PumpState },
    /// Unrecognized tag or malformed payload. Ignored by consumers.
    Unknown,
}

/// Outcome kind of a `save:` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Success,
    Error,
}

/// Decode a single text frame.
pub fn decode(frame: &str) -> PushFrame {
    let Some((tag, rest)) = frame.split_once(':') else {
        return PushFrame::Unknown;
    };
    match tag {
        "update" => decode_update(rest),
        "save" => decode_save(rest),
        "pump" => decode_pump(rest),
        _ => PushFrame::Unknown,
    }
}

fn decode_update(rest: &str) -> PushFrame {
    // `update:error:` carries opaque remainder text - never re-split it.
    if let Some(message) = rest.strip_prefix("error:") {
        return PushFrame::UpdateError {
            message: message.to_string(),
        };
    }
    match rest.parse::<u8>() {
        Ok(percent) if percent <= 100 => PushFrame::Update { percent },
        _ => PushFrame::Unknown,
    }
}

fn decode_save(rest: &str) -> PushFrame {
    let Some((kind, text)) = rest.split_once(':') else {
        return PushFrame::Unknown;
    };
    let kind = match kind {
        "success" => SaveKind::Success,
        "error" => SaveKind::Error,
        _ => return PushFrame::Unknown,
    };
    PushFrame::Save {
        kind,
        text: text.to_string(),
    }
}

fn decode_pump(rest: &str) -> PushFrame {
    let Some((id, state)) = rest.split_once(':') else {
        return PushFrame::Unknown;
    };
    let Ok(id) = id.parse::<usize>() else {
        return PushFrame::Unknown;
    };
    let state = match state {
        "active" => PumpState::Active,
        "inactive" => PumpState::Inactive,
        _ => return PushFrame::Unknown,
    };
    PushFrame::Pump { id, state }
}
