//! Telegram transport: teloxide long polling in, plain-text replies out.
//!
//! Each update becomes an [`InboundMessage`] for [`crate::bot::Dispatcher`]
//! and the reply goes back to the same chat. teloxide runs chats
//! concurrently and keeps updates from one chat in order.

use std::sync::Arc;

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tracing::{debug, info, warn};

use crate::bot::{Dispatcher as MessageDispatcher, InboundMessage};

/// Longest chunk sent in one Telegram message, in UTF-16 code units.
/// Telegram caps messages at 4096 of them.
pub const MESSAGE_CHUNK_UNITS: usize = 4000;

/// Shared dependencies injected into teloxide handlers via `dptree::deps!`.
#[derive(Clone)]
struct SharedState {
    dispatcher: Arc<MessageDispatcher>,
}

/// Run the Telegram bot until Ctrl+C.
///
/// # Errors
///
/// Currently infallible once started; the `Result` keeps the entry point
/// uniform with the console transport.
pub async fn run_telegram(
    bot_token: &str,
    dispatcher: Arc<MessageDispatcher>,
) -> anyhow::Result<()> {
    let bot = Bot::new(bot_token);
    let shared = SharedState { dispatcher };

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    info!("telegram dispatcher starting");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![shared])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("telegram dispatcher stopped");
    Ok(())
}

/// Handle one incoming Telegram message.
async fn handle_message(bot: Bot, msg: Message, state: SharedState) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = msg.chat.id.0, "message without sender, ignoring");
        return Ok(());
    };

    let inbound = InboundMessage {
        sender_id: user.id.0.to_string(),
        sender_display_name: user.first_name.clone(),
        text: msg.text().unwrap_or_default().to_owned(),
    };
    debug!(sender_id = %inbound.sender_id, "telegram message received");

    let reply = state.dispatcher.handle(&inbound).await;

    for chunk in split_message(&reply, MESSAGE_CHUNK_UNITS) {
        if let Err(e) = bot.send_message(msg.chat.id, chunk).await {
            warn!(error = %e, sender_id = %inbound.sender_id, "failed to send telegram message");
            break;
        }
    }

    Ok(())
}

/// Split `text` into chunks of at most `limit` UTF-16 code units, the unit
/// Telegram measures message length in, preferring to break after a
/// newline. Always returns at least one chunk.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 {
        return vec![text.to_owned()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while utf16_len(rest) > limit {
        let hard = hard_cut(rest, limit);
        let cut = match rest[..hard].rfind('\n') {
            Some(i) if i > 0 => i,
            _ => hard,
        };
        chunks.push(rest[..cut].to_owned());
        let tail = &rest[cut..];
        rest = tail.strip_prefix('\n').unwrap_or(tail);
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_owned());
    }
    chunks
}

/// Message length as Telegram counts it.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Byte offset of the longest prefix within `limit` UTF-16 units. Never
/// zero for non-empty text, so a pair wider than `limit` still advances.
fn hard_cut(text: &str, limit: usize) -> usize {
    let mut units = 0_usize;
    for (i, c) in text.char_indices() {
        units = units.saturating_add(c.len_utf16());
        if units > limit {
            return if i == 0 { c.len_utf8() } else { i };
        }
    }
    text.len()
}
