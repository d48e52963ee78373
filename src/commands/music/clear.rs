use super::*;
use crate::commands::music::utils::embedded_messages;
use tracing::info;

/// Remove every pending track; the current track keeps playing
#[poise::command(slash_command, category = "Music")]
pub async fn clear(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;
    let queues = ctx.data().music.queues();

    let removed = queues.len(guild_id);
    queues.clear(guild_id);
    info!("Cleared {} pending track(s) in guild {}", removed, guild_id);

    ctx.send(embedded_messages::queue_cleared(removed)).await?;
    Ok(())
}
