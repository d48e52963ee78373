use super::*;
use crate::commands::music::utils::embedded_messages;

/// Stop playback, clear the queue and leave the voice channel
#[poise::command(slash_command, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;

    match ctx
        .data()
        .music
        .disconnect(ctx.serenity_context(), guild_id)
        .await
    {
        Ok(()) => {
            ctx.send(embedded_messages::left_voice_channel()).await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::music_error(&err)).await?;
        }
    }

    Ok(())
}
