//! Push channel listener
//!
//! Owns the WebSocket connection to the device for the life of the
//! session. The device only ever sends; each text frame is decoded and
//! applied to believed state, and the resulting side effects (notice,
//! slice re-render, delayed resync) run here. A dropped channel comes
//! back with exponential backoff unless reconnection is disabled, in
//! which case it stays down until restart.

use futures_util::StreamExt;
use std::sync::Arc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use doser_proto::{decode, PushFrame};

use crate::config::{Config, ReconnectConfig};
use crate::engine::Resync;
use crate::notify::NotificationCenter;
use crate::render::{render_slice, Renderer};
use crate::state::StateHandle;
use crate::sync::apply_frame;

/// Listens on the device's WebSocket and applies push frames.
pub struct PushListener {
    url: String,
    reconnect: ReconnectConfig,
    state: StateHandle,
    renderer: Arc<dyn Renderer>,
    notices: Arc<NotificationCenter>,
    resync: Resync,
}

impl PushListener {
    pub fn new(
        config: &Config,
        state: StateHandle,
        renderer: Arc<dyn Renderer>,
        notices: Arc<NotificationCenter>,
        resync: Resync,
    ) -> Self {
        Self {
            url: config.device.ws_url(),
            reconnect: config.reconnect.clone(),
            state,
            renderer,
            notices,
            resync,
        }
    }

    /// Run until cancelled. Returns early only when reconnection is
    /// disabled and the connection is gone.
    pub async fn run(self, cancel: CancellationToken) {
        let mut backoff = self.reconnect.initial_backoff;

        loop {
            match connect_async(self.url.as_str()).await {
                Ok((mut stream, _)) => {
                    tracing::info!("push channel connected to {}", self.url);
                    backoff = self.reconnect.initial_backoff;

                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            message = stream.next() => match message {
                                Some(Ok(Message::Text(text))) => {
                                    self.handle_frame(text.as_str()).await;
                                }
                                Some(Ok(_)) => {
                                    // binary/ping/pong frames are not part
                                    // of the device protocol
                                }
                                Some(Err(e)) => {
                                    tracing::warn!("push channel error: {}", e);
                                    break;
                                }
                                None => {
                                    tracing::warn!("push channel closed by device");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("push channel connect to {} failed: {}", self.url, e);
                }
            }

            if !self.reconnect.enabled {
                tracing::warn!("push channel down and reconnection is disabled");
                return;
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(self.reconnect.max_backoff);
        }
    }

    async fn handle_frame(&self, text: &str) {
        let frame = decode(text);
        if frame == PushFrame::Unknown {
            tracing::debug!("ignoring unrecognized push frame {:?}", text);
            return;
        }

        let outcome = {
            let mut state = self.state.write().await;
            let outcome = apply_frame(&mut state, frame);
            if let Some(slice) = outcome.rerender {
                render_slice(&state, slice, &*self.renderer);
            }
            outcome
        };

        if let Some(notice) = outcome.notification {
            self.notices.show(notice).await;
        }
        if outcome.schedule_resync {
            self.resync.schedule();
        }
    }
}
