//! PTY (console) comms channel — reads lines from stdin, feeds them through
//! the survey engine, prints the reply to stdout.
//!
//! All engine access goes through [`CommsState::submit_turn`]; this module
//! sees nothing else.  Suggested-reply options are rendered as a bracketed
//! list since a terminal has no tap targets.
//!
//! Runs until the `shutdown` token is cancelled (Ctrl-C) or stdin closes.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::survey::Markup;
use super::runtime::{Component, ComponentFuture};
use super::state::{CommsEvent, CommsState};

/// A PTY channel instance.  Multiple instances would each get a unique id.
pub struct PtyChannel {
    channel_id: String,
    state: Arc<CommsState>,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_pty(self.channel_id, self.state, shutdown))
    }
}

async fn run_pty(
    channel_id: String,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    info!(%channel_id, "pty channel started — type /start to begin a survey. Ctrl-C to quit.");
    println!("──────────────────────────────────");
    println!(" Cohort console  (Ctrl-C to quit)");
    println!("──────────────────────────────────");

    // The console is a single conversation.
    let conversation_id = format!("{channel_id}:console");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        print!("> ");
        use std::io::Write as _;
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!("\n[pty] shutdown signal received — closing console channel");
                info!("pty channel shutting down");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => {
                        if input.trim().is_empty() { continue; }

                        debug!(input = %input, "pty received line");

                        let reply = state.submit_turn(&conversation_id, &input).await;
                        println!("{}", reply.text);
                        if let Markup::Options(options) = &reply.markup {
                            for option in options {
                                println!("  [{option}]");
                            }
                        }
                    }
                }
            }
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}
