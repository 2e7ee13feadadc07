//! Applying push frames to believed state
//!
//! Decoded frames become state transitions here, separated from the
//! socket so the rules stay testable. Each application returns a
//! [`FrameOutcome`] naming the side effects the caller must run: which
//! notification to surface, whether to schedule the delayed resync, and
//! which slice to re-render. Frames never mutate slices they do not own:
//! update frames touch only the progress machine, pump frames touch only
//! one badge, save frames touch nothing at all.

use doser_proto::PushFrame;

use crate::notify::Notice;
use crate::state::{SharedState, Slice, UpdateProgress};

/// Notification text surfaced when an update reaches 100%.
pub const UPDATE_COMPLETE_TEXT: &str = "Firmware update complete";

/// Side effects of applying one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameOutcome {
    pub notification: Option<Notice>,
    pub schedule_resync: bool,
    pub rerender: Option<Slice>,
}

/// Apply one decoded frame to the believed state.
pub fn apply_frame(state: &mut SharedState, frame: PushFrame) -> FrameOutcome {
    match frame {
        PushFrame::Update { percent } => apply_update(state, percent),
        PushFrame::UpdateError { message } => {
            state.update = UpdateProgress::Error(message.clone());
            FrameOutcome {
                notification: Some(Notice::error(message)),
                rerender: Some(Slice::Update),
                ..FrameOutcome::default()
            }
        }
        PushFrame::Save { kind, text } => FrameOutcome {
            notification: Some(Notice {
                kind: kind.into(),
                text,
            }),
            ..FrameOutcome::default()
        },
        PushFrame::Pump { id, state: badge } => {
            // Push frames use 1-based pump ids.
            let applied = id
                .checked_sub(1)
                .is_some_and(|index| state.set_pump_state(index, badge));
            if applied {
                FrameOutcome {
                    rerender: Some(Slice::Pumps),
                    ..FrameOutcome::default()
                }
            } else {
                tracing::debug!("pump state frame for unknown pump {}", id);
                FrameOutcome::default()
            }
        }
        PushFrame::Unknown => FrameOutcome::default(),
    }
}

fn apply_update(state: &mut SharedState, percent: u8) -> FrameOutcome {
    if percent < 100 {
        state.update = UpdateProgress::InProgress(percent);
        return FrameOutcome {
            rerender: Some(Slice::Update),
            ..FrameOutcome::default()
        };
    }

    // Completion must schedule exactly one resync; a repeated 100 (for
    // example replayed around a reconnect) stays a no-op.
    if state.update == UpdateProgress::Done {
        return FrameOutcome::default();
    }
    state.update = UpdateProgress::Done;
    FrameOutcome {
        notification: Some(Notice::success(UPDATE_COMPLETE_TEXT)),
        schedule_resync: true,
        rerender: Some(Slice::Update),
    }
}
