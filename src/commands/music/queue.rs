use super::*;
use crate::commands::music::utils::embedded_messages;

/// View the current music queue
#[poise::command(slash_command, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;
    let music = &ctx.data().music;

    let state = music.controller().state(guild_id).await;
    let pending = music.queues().peek_all(guild_id);

    if state.is_idle() && pending.is_empty() {
        ctx.send(embedded_messages::queue_is_empty()).await?;
    } else {
        ctx.send(embedded_messages::music_queue(&state, &pending))
            .await?;
    }

    Ok(())
}
