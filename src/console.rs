//! Line-oriented console transport.
//!
//! Every input line is one inbound message from a fixed sender; every reply
//! is written back followed by a blank line. Handy for trying the bot
//! without Telegram.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::bot::{Dispatcher, InboundMessage};

/// Fixed sender identity for a console session.
#[derive(Debug, Clone)]
pub struct ConsoleSender {
    /// Identifier used for directory lookups.
    pub sender_id: String,
    /// Display name used for registration.
    pub display_name: String,
}

/// Feed `input` line by line through `dispatcher`, writing replies to `output`.
///
/// Returns the number of messages handled. Stops at end of input.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub async fn run_console<R, W>(
    dispatcher: &Dispatcher,
    sender: &ConsoleSender,
    input: R,
    mut output: W,
) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled: usize = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let inbound = InboundMessage {
            sender_id: sender.sender_id.clone(),
            sender_display_name: sender.display_name.clone(),
            text: line,
        };
        let reply = dispatcher.handle(&inbound).await;
        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n\n").await?;
        output.flush().await?;
        handled = handled.saturating_add(1);
    }

    debug!(handled, "console input exhausted");
    Ok(handled)
}
