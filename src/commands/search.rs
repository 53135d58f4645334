use search_plus::Plugin;
use tracing::debug;

use super::*;

/// Search the web and summarize the results with AI.
#[poise::command(slash_command, category = "Search")]
pub async fn search(
    ctx: Context<'_>,
    #[description = "Your search query, optionally as <type>#<keywords>"]
    #[rest]
    query: String,
) -> CommandResult {
    let query = query.trim();
    debug!("Search command from {}: {}", ctx.author().name, query);

    if query.is_empty() {
        return chunk_response(ctx, ctx.data().relay.help_text()).await;
    }

    ctx.defer().await?;

    let reply = ctx.data().relay.relay(query).await.into_reply();
    let full_message = format!("**Search Query**: {query}\n\n{}", render_reply(&reply));

    chunk_response(ctx, full_message).await
}

/// Show how to use the search plugin.
#[poise::command(slash_command, category = "Search")]
pub async fn search_help(ctx: Context<'_>) -> CommandResult {
    chunk_response(ctx, ctx.data().relay.help_text()).await
}
