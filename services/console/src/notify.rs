//! Single-slot transient notifications
//!
//! At most one notification is ever visible. Showing a new one replaces
//! the current one immediately; the visible phase lasts 3000 ms, then the
//! notification fades for 300 ms before it is fully removed. Concurrent
//! shows collapse to the latest: an older notification's pending
//! dismissal is invalidated by the sequence counter and never fires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use doser_proto::SaveKind;

use crate::render::Renderer;

/// How long a notification stays fully visible.
pub const NOTICE_VISIBLE: Duration = Duration::from_millis(3000);

/// How long the fade-out lasts before the notification is removed.
pub const NOTICE_FADE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

impl From<SaveKind> for NoticeKind {
    fn from(kind: SaveKind) -> Self {
        match kind {
            SaveKind::Success => NoticeKind::Success,
            SaveKind::Error => NoticeKind::Error,
        }
    }
}

/// A notification to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// The currently displayed notification and its phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNotice {
    pub notice: Notice,
    pub fading: bool,
}

/// Owns the single notification slot and its dismissal timers.
pub struct NotificationCenter {
    renderer: Arc<dyn Renderer>,
    slot: Arc<RwLock<Option<ActiveNotice>>>,
    seq: Arc<AtomicU64>,
}

impl NotificationCenter {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            slot: Arc::new(RwLock::new(None)),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace whatever is displayed with `notice` and schedule its
    /// dismissal.
    pub async fn show(&self, notice: Notice) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("showing {:?} notification: {}", notice.kind, notice.text);

        {
            let mut slot = self.slot.write().await;
            *slot = Some(ActiveNotice {
                notice,
                fading: false,
            });
            self.renderer.render_notification(slot.as_ref());
        }

        let slot = Arc::clone(&self.slot);
        let seq_counter = Arc::clone(&self.seq);
        let renderer = Arc::clone(&self.renderer);
        tokio::spawn(async move {
            tokio::time::sleep(NOTICE_VISIBLE).await;
            {
                let mut guard = slot.write().await;
                if seq_counter.load(Ordering::SeqCst) != seq {
                    return;
                }
                if let Some(active) = guard.as_mut() {
                    active.fading = true;
                }
                renderer.render_notification(guard.as_ref());
            }

            tokio::time::sleep(NOTICE_FADE).await;
            let mut guard = slot.write().await;
            if seq_counter.load(Ordering::SeqCst) != seq {
                return;
            }
            *guard = None;
            renderer.render_notification(None);
        });
    }

    /// The currently displayed notification, if any.
    pub async fn current(&self) -> Option<ActiveNotice> {
        self.slot.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_support::{Rendered, RecordingRenderer};

    fn center() -> (NotificationCenter, Arc<RecordingRenderer>) {
        let renderer = Arc::new(RecordingRenderer::default());
        let center = NotificationCenter::new(Arc::clone(&renderer) as Arc<dyn Renderer>);
        (center, renderer)
    }

    #[tokio::test(start_paused = true)]
    async fn notice_is_visible_then_fades_then_disappears() {
        let (center, _renderer) = center();
        center.show(Notice::success("Settings saved")).await;

        let active = center.current().await.unwrap();
        assert_eq!(active.notice.text, "Settings saved");
        assert!(!active.fading);

        tokio::time::sleep(NOTICE_VISIBLE + Duration::from_millis(50)).await;
        let active = center.current().await.unwrap();
        assert!(active.fading);

        tokio::time::sleep(NOTICE_FADE).await;
        assert!(center.current().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_notice_replaces_older_immediately() {
        let (center, _renderer) = center();
        center.show(Notice::success("first")).await;
        center.show(Notice::error("second")).await;

        let active = center.current().await.unwrap();
        assert_eq!(active.notice.text, "second");
        assert_eq!(active.notice.kind, NoticeKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn older_dismissal_does_not_remove_newer_notice() {
        let (center, _renderer) = center();
        center.show(Notice::success("first")).await;

        tokio::time::sleep(Duration::from_millis(1000)).await;
        center.show(Notice::success("second")).await;

        // The first notice's visible window has elapsed; the second must
        // still be fully visible.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let active = center.current().await.unwrap();
        assert_eq!(active.notice.text, "second");
        assert!(!active.fading);

        // And the second dismisses on its own schedule.
        tokio::time::sleep(Duration::from_millis(600) + NOTICE_FADE).await;
        assert!(center.current().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn renders_every_phase() {
        let (center, renderer) = center();
        center.show(Notice::success("saved")).await;
        tokio::time::sleep(NOTICE_VISIBLE + NOTICE_FADE + Duration::from_millis(50)).await;

        let notifications: Vec<_> = renderer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Rendered::Notification(n) => Some(n),
                _ => None,
            })
            .collect();

        assert_eq!(notifications.len(), 3);
        assert!(matches!(&notifications[0], Some(n) if !n.fading));
        assert!(matches!(&notifications[1], Some(n) if n.fading));
        assert!(notifications[2].is_none());
    }
}
