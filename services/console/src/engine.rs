//! Engine: schedules the poll loops and the delayed resync
//!
//! Three periodic tasks replace their state slice wholesale on each tick
//! and re-render only that slice. The cadences are independent and never
//! aligned; a failed tick changes nothing and the next tick is the retry.
//! The engine also owns the resync channel - the reload analogue: a
//! completed firmware update or an accepted reboot schedules a full
//! re-fetch of everything after a fixed delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::device::DeviceClient;
use crate::render::{render_slice, Renderer};
use crate::state::{Slice, StateHandle, UpdateProgress};

/// Delay between a resync trigger and the resync itself, matching the
/// device's own post-update settling window.
pub const RELOAD_DELAY: Duration = Duration::from_millis(3000);

/// Handle for scheduling a delayed full resync.
#[derive(Debug, Clone)]
pub struct Resync {
    tx: mpsc::Sender<()>,
}

impl Resync {
    /// Schedule one resync, [`RELOAD_DELAY`] from now.
    pub fn schedule(&self) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RELOAD_DELAY).await;
            if tx.send(()).await.is_err() {
                tracing::debug!("resync requested but no engine is running");
            }
        });
    }

    /// A handle whose requests go nowhere. Used by one-shot commands that
    /// exit before a resync could matter.
    pub fn disabled() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }

    #[cfg(test)]
    pub(crate) fn with_sender(tx: mpsc::Sender<()>) -> Self {
        Self { tx }
    }
}

/// The engine drives polling and resyncs until cancelled
pub struct Engine {
    config: Config,
    device: Arc<DeviceClient>,
    state: StateHandle,
    renderer: Arc<dyn Renderer>,
    cancel: CancellationToken,
    resync_rx: mpsc::Receiver<()>,
}

impl Engine {
    pub fn new(
        config: Config,
        device: Arc<DeviceClient>,
        state: StateHandle,
        renderer: Arc<dyn Renderer>,
        cancel: CancellationToken,
    ) -> (Self, Resync) {
        let (tx, resync_rx) = mpsc::channel(4);
        let engine = Self {
            config,
            device,
            state,
            renderer,
            cancel,
            resync_rx,
        };
        (engine, Resync { tx })
    }

    /// Run until the cancellation token fires.
    pub async fn run(mut self) {
        // MQTT settings are fetched once at startup, not polled.
        if let Some(mqtt) = self.device.fetch_mqtt().await {
            let mut state = self.state.write().await;
            state.replace_mqtt(mqtt);
            render_slice(&state, Slice::Mqtt, &*self.renderer);
        }

        let mut handles = Vec::new();
        for (slice, interval) in [
            (Slice::Clock, self.config.polling.clock_interval),
            (Slice::Pumps, self.config.polling.pump_interval),
            (Slice::System, self.config.polling.system_interval),
        ] {
            let device = Arc::clone(&self.device);
            let state = Arc::clone(&self.state);
            let renderer = Arc::clone(&self.renderer);
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(async move {
                poll_loop(slice, device, state, renderer, interval, cancel).await;
            }));
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                Some(()) = self.resync_rx.recv() => {
                    full_resync(&self.device, &self.state, &*self.renderer).await;
                }
            }
        }

        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// One poll cycle: fetch the slice's snapshot, replace it wholesale,
/// re-render that slice. Then sleep until the next tick or cancellation.
async fn poll_loop(
    slice: Slice,
    device: Arc<DeviceClient>,
    state: StateHandle,
    renderer: Arc<dyn Renderer>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        poll_once(slice, &device, &state, &*renderer).await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => {
                tracing::debug!("poll loop for {:?} cancelled", slice);
                break;
            }
        }
    }
}

async fn poll_once(
    slice: Slice,
    device: &DeviceClient,
    state: &StateHandle,
    renderer: &dyn Renderer,
) {
    match slice {
        Slice::Clock => {
            if let Some(clock) = device.fetch_clock().await {
                let mut state = state.write().await;
                state.replace_clock(clock);
                render_slice(&state, Slice::Clock, renderer);
            }
        }
        Slice::Pumps => {
            if let Some(pumps) = device.fetch_pumps().await {
                let mut state = state.write().await;
                state.replace_pumps(pumps);
                render_slice(&state, Slice::Pumps, renderer);
            }
        }
        Slice::System => {
            if let Some(system) = device.fetch_system().await {
                let mut state = state.write().await;
                state.replace_system(system);
                render_slice(&state, Slice::System, renderer);
            }
        }
        // Update progress and MQTT settings have no poll cycle.
        Slice::Update | Slice::Mqtt => {}
    }
}

/// Re-fetch everything and reset update progress, then re-render all
/// slices. Slices that fail to fetch keep their previous snapshot.
async fn full_resync(device: &DeviceClient, state: &StateHandle, renderer: &dyn Renderer) {
    tracing::info!("resynchronizing device state");

    let pumps = device.fetch_pumps().await;
    let mqtt = device.fetch_mqtt().await;
    let system = device.fetch_system().await;

    let mut state = state.write().await;
    state.update = UpdateProgress::Idle;
    if let Some(pumps) = pumps {
        state.replace_pumps(pumps);
    }
    if let Some(mqtt) = mqtt {
        state.replace_mqtt(mqtt);
    }
    if let Some(system) = system {
        state.replace_system(system);
    }

    render_slice(&state, Slice::Update, renderer);
    render_slice(&state, Slice::Pumps, renderer);
    render_slice(&state, Slice::Mqtt, renderer);
    render_slice(&state, Slice::System, renderer);
}
