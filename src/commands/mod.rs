//! This module aggregates the bot's slash commands.

/// Commands backed by the search relay.
pub(crate) mod search;

use search_plus::utils::chunk::{MAX_MESSAGE_LENGTH, split_message};
use search_plus::{Reply, ReplyKind};

use crate::CommandResult;
use crate::Context;

/// Renders a plugin reply as Discord message text.
pub(crate) fn render_reply(reply: &Reply) -> String {
    match reply.kind {
        ReplyKind::Text => reply.content.clone(),
        ReplyKind::Error => format!("⚠️ {}", reply.content),
    }
}

/// Sends a potentially long response string by splitting it into chunks
/// that respect Discord's message length limit.
pub async fn chunk_response<S: AsRef<str>>(ctx: Context<'_>, response: S) -> CommandResult {
    for chunk in split_message(response.as_ref(), MAX_MESSAGE_LENGTH) {
        ctx.say(chunk).await?;
    }

    Ok(())
}
