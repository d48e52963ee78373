use super::*;
use crate::commands::music::utils::{
    embedded_messages,
    music_manager::{MusicError, PlayReport},
};
use tracing::{info, warn};

/// Play a song from a search query, a YouTube URL or a Spotify track URL
#[poise::command(slash_command, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let guild_id = require_guild(&ctx)?;
    let music = &ctx.data().music;

    // Resolving may take a while
    ctx.defer().await?;

    let player = match music
        .connect_to_user(ctx.serenity_context(), guild_id, ctx.author().id)
        .await
    {
        Ok(player) => player,
        Err(err) => {
            ctx.send(embedded_messages::music_error(&err)).await?;
            return Ok(());
        }
    };

    let requested_by = ctx.author().display_name().to_string();

    let reply = match music
        .enqueue_query(guild_id, player, &query, &requested_by)
        .await
    {
        Ok(PlayReport::NowPlaying(track)) => embedded_messages::now_playing(&track),
        Ok(PlayReport::Queued { track, position }) => {
            embedded_messages::added_to_queue(&track, position)
        }
        Err(MusicError::NotFound(reason)) => {
            info!("No match for '{}': {}", query, reason);
            embedded_messages::could_not_find(&query)
        }
        Err(err) => {
            warn!("Play request '{}' failed in guild {}: {}", query, guild_id, err);
            embedded_messages::music_error(&err)
        }
    };

    ctx.send(reply).await?;
    Ok(())
}
