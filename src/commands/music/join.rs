use super::*;
use crate::commands::music::utils::{embedded_messages, music_manager::MusicManager};
use poise::serenity_prelude::Mentionable;
use tracing::info;

/// Join your current voice channel
#[poise::command(slash_command, category = "Music")]
pub async fn join(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;
    let music = &ctx.data().music;

    if music.sessions().contains(guild_id) {
        ctx.send(embedded_messages::already_connected()).await?;
        return Ok(());
    }

    let channel_id = match MusicManager::get_user_voice_channel(
        ctx.serenity_context(),
        guild_id,
        ctx.author().id,
    ) {
        Ok(channel_id) => channel_id,
        Err(err) => {
            ctx.send(embedded_messages::music_error(&err)).await?;
            return Ok(());
        }
    };

    match music
        .connect(ctx.serenity_context(), guild_id, channel_id)
        .await
    {
        Ok(_) => {
            info!("Joined channel {} in guild {}", channel_id, guild_id);
            ctx.send(embedded_messages::joined_voice_channel(&channel_id.mention().to_string()))
                .await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::failed_to_join_voice_channel(&err))
                .await?;
        }
    }

    Ok(())
}
