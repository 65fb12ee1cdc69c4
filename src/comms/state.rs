//! Shared state for the comms layer — capability boundary for channels.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below.  The survey engine itself is private; channels cannot
//! reach sessions or storage directly.
//!
//! [`CommsState::report_event`] lets a running channel signal the comms
//! manager (e.g. "I shut down") without further coupling; the manager owns
//! the receiver end.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::survey::{Reply, SurveyEngine};

/// Events a channel sends back to the comms manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
}

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    /// Survey engine — private so channels only see `submit_turn`.
    engine: Arc<SurveyEngine>,
    /// Back-channel to the comms manager.
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(engine: Arc<SurveyEngine>, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        Self { engine, event_tx }
    }

    /// Feed one user turn from `conversation_id` through the survey engine
    /// and return the reply to render.
    ///
    /// This is the only inbound path for all comms channels.
    pub async fn submit_turn(&self, conversation_id: &str, text: &str) -> Reply {
        self.engine.handle_turn(conversation_id, text).await
    }

    /// Report an event to the comms manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is
    /// not keeping up (channel full) or has already exited (closed).
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}
