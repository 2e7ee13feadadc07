//! doser-console - client for a multi-pump dosing controller
//!
//! Maintains a believed copy of device state from two independent
//! channels - scheduled REST polling and asynchronous WebSocket push
//! frames - and drives a renderer seam and a command dispatcher.

pub mod config;
pub mod device;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod io;
pub mod notify;
pub mod push;
pub mod render;
pub mod state;
pub mod sync;

pub use config::{load_config, Config};
pub use error::{ConsoleError, Result};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::device::DeviceClient;
use crate::dispatch::Dispatcher;
use crate::engine::{Engine, Resync};
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::notify::NotificationCenter;
use crate::push::PushListener;
use crate::render::{Renderer, TracingRenderer};
use crate::state::{new_state_handle, StateHandle};

/// Run the console in watch mode with the given configuration.
///
/// Polls the device, listens on the push channel, and renders until
/// ctrl-c.
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::default());
    let cancel = CancellationToken::new();

    let state = new_state_handle();
    let renderer: Arc<dyn Renderer> = Arc::new(TracingRenderer);
    let notices = Arc::new(NotificationCenter::new(Arc::clone(&renderer)));
    let device = Arc::new(DeviceClient::new(&config.device, Arc::clone(&http)));

    let (engine, resync) = Engine::new(
        config.clone(),
        Arc::clone(&device),
        Arc::clone(&state),
        Arc::clone(&renderer),
        cancel.clone(),
    );

    let listener = PushListener::new(
        &config,
        Arc::clone(&state),
        Arc::clone(&renderer),
        Arc::clone(&notices),
        resync,
    );
    let push_handle = tokio::spawn(listener.run(cancel.clone()));

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    tracing::info!("Console engine started");

    // Run the engine (blocks until cancelled)
    engine.run().await;

    let _ = push_handle.await;
    tracing::info!("Console engine stopped");

    Ok(())
}

/// A dispatcher over freshly fetched device state, for one-shot commands.
pub struct CommandContext {
    pub dispatcher: Dispatcher,
    pub state: StateHandle,
}

/// Build a [`CommandContext`]: fetch the current pump list so edits
/// patch real state before posting it back.
pub async fn command_context(config: &Config) -> CommandContext {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::default());
    let state = new_state_handle();
    let renderer: Arc<dyn Renderer> = Arc::new(TracingRenderer);
    let notices = Arc::new(NotificationCenter::new(renderer));
    let device = DeviceClient::new(&config.device, Arc::clone(&http));

    if let Some(pumps) = device.fetch_pumps().await {
        state.write().await.replace_pumps(pumps);
    }

    let dispatcher = Dispatcher::new(
        config.device.http_base(),
        http,
        Arc::clone(&state),
        notices,
        Resync::disabled(),
    );

    CommandContext { dispatcher, state }
}
