//! Telegram comms channel — receives messages via the Telegram API, feeds
//! them through the survey engine, and replies with a reply keyboard for
//! the current step's options.

use std::env;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatId, KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::survey::{Markup, Reply};
use super::runtime::{Component, ComponentFuture};
use super::state::{CommsEvent, CommsState};

/// Telegram has a 4096 character limit per message.
/// We chunk at 4000 to be safe.
const MAX_MESSAGE_LENGTH: usize = 4000;

/// A Telegram channel instance.
pub struct TelegramChannel {
    channel_id: String,
    state: Arc<CommsState>,
}

impl TelegramChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Component for TelegramChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_telegram(self.channel_id, self.state, shutdown))
    }
}

/// Map engine markup onto Telegram reply-keyboard types.
fn render_markup(markup: &Markup) -> ReplyMarkup {
    match markup {
        Markup::Options(options) => {
            let rows: Vec<Vec<KeyboardButton>> = options
                .iter()
                .map(|option| vec![KeyboardButton::new(option.clone())])
                .collect();
            ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
        }
        Markup::Clear => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

/// Send `reply`, chunked to Telegram's message size limit.  The keyboard
/// rides on the final chunk so it is what the user sees last.
async fn send_reply(bot: &Bot, chat_id: ChatId, reply: &Reply) {
    let mut text = reply.text.clone();
    if text.is_empty() {
        text = "(empty response)".to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let chunks: Vec<String> = chars
        .chunks(MAX_MESSAGE_LENGTH)
        .map(|chunk| chunk.iter().collect())
        .collect();
    let last = chunks.len().saturating_sub(1);

    for (i, chunk) in chunks.into_iter().enumerate() {
        let mut request = bot.send_message(chat_id, chunk);
        if i == last {
            request = request.reply_markup(render_markup(&reply.markup));
        }
        if let Err(e) = request.await {
            warn!("failed to send telegram reply: {e}");
        }
    }
}

async fn run_telegram(
    channel_id: String,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let token = match env::var("TELEGRAM_BOT_TOKEN") {
        Ok(t) => t,
        Err(_) => {
            warn!(%channel_id, "TELEGRAM_BOT_TOKEN not set, telegram channel exiting");
            return Ok(());
        }
    };

    info!(%channel_id, "telegram channel starting");

    let bot = Bot::new(token);

    let state_clone = state.clone();
    let channel_id_clone = channel_id.clone();

    let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let state = state_clone.clone();
        let channel_id = channel_id_clone.clone();
        async move {
            if let Some(text) = msg.text() {
                debug!(
                    %channel_id,
                    from = ?msg.from.as_ref().and_then(|u| u.username.as_ref()),
                    "telegram received message"
                );

                // Each chat is its own survey conversation.
                let conversation_id = format!("{channel_id}:{}", msg.chat.id);
                let reply = state.submit_turn(&conversation_id, text).await;
                send_reply(&bot, msg.chat.id, &reply).await;
            }
            respond(())
        }
    });

    let mut dispatcher = Dispatcher::builder(bot, handler).build();

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            info!(%channel_id, "shutdown signal received — closing telegram channel");
        }
        _ = dispatcher.dispatch() => {
            warn!(%channel_id, "telegram dispatcher exited unexpectedly");
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}
