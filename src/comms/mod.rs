//! Comms layer — manages all external I/O channels.
//!
//! # Architecture
//!
//! Each channel (PTY, Telegram…) implements [`runtime::Component`] and is
//! spawned as an independent concurrent task by [`start`] via
//! [`runtime::spawn_components`].  Channels capture their shared
//! [`Arc<CommsState>`] at construction time; the generic `Component::run`
//! signature only carries the shutdown token.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events).  It is drained by a short-lived
//! background task that dies naturally when all channel senders drop.
//!
//! [`start`] is synchronous — it returns a [`SubsystemHandle`] as soon as
//! the tasks are spawned.  The caller decides when to await it.

pub mod runtime;
mod state;

#[cfg(feature = "channel-pty")]
pub mod pty;
#[cfg(feature = "channel-telegram")]
pub mod telegram;

pub use state::{CommsEvent, CommsState};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::survey::SurveyEngine;
use runtime::{spawn_components, Component, SubsystemHandle};

/// Spawn all configured comms channels and return a [`SubsystemHandle`].
///
/// Channels start immediately.  If any channel exits with an error the
/// shared `shutdown` token is cancelled so siblings stop cooperatively.
/// The handle resolves when all channels have exited.
pub fn start(
    config: &Config,
    engine: Arc<SurveyEngine>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    // Intra-subsystem event channel: channels → manager.
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::new(engine, event_tx));

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            components.push(Box::new(pty::PtyChannel::new("pty0", state.clone())));
        }
    }

    #[cfg(feature = "channel-telegram")]
    {
        if config.comms_telegram_should_load() {
            info!("loading telegram channel");
            components.push(Box::new(telegram::TelegramChannel::new("telegram0", state.clone())));
        }
    }

    // With zero channels there is nothing for spawn_components to wait on
    // and the handle would resolve immediately, exiting the process. Park
    // on the shutdown token instead so a channel-less run idles until
    // Ctrl-C.
    if components.is_empty() {
        info!("no comms channels configured — waiting for shutdown");
        let token = shutdown.clone();
        return SubsystemHandle::from_handle(tokio::spawn(async move {
            token.cancelled().await;
            Ok(())
        }));
    }

    // Background event drain: consumes CommsEvent until all channel senders
    // are dropped.  Monitoring only; does not affect lifecycle.
    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
            }
        }
    });

    spawn_components(components, shutdown)
}
