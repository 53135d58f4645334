use poise::serenity_prelude as serenity;
use tracing::{debug, error};

use search_plus::EventContext;
use search_plus::plugin::dispatch;
use search_plus::utils::chunk::{MAX_MESSAGE_LENGTH, split_message};

use crate::commands::render_reply;
use crate::{Data, Error};

/// Framework-level event hook. Offers every user message to the registered plugins.
pub(crate) async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        if new_message.author.bot {
            return Ok(());
        }
        if let Err(e) = handle_message(ctx, new_message, data).await {
            error!("Error handling message {}: {}", new_message.id, e);
        }
    }
    Ok(())
}

async fn handle_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    let mut event_ctx = EventContext::new(message.content.clone());
    dispatch(&data.plugins, &mut event_ctx).await;

    if !event_ctx.is_handled() {
        return Ok(());
    }
    let Some(reply) = event_ctx.reply else {
        return Ok(());
    };
    debug!("Replying to message {} from {}", message.id, message.author.name);

    let rendered = render_reply(&reply);
    for (i, chunk) in split_message(&rendered, MAX_MESSAGE_LENGTH)
        .into_iter()
        .enumerate()
    {
        if i == 0 {
            message.reply(ctx, chunk).await?;
        } else {
            message.channel_id.say(ctx, chunk).await?;
        }
    }

    Ok(())
}
