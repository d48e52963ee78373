use super::*;
use crate::commands::music::utils::{embedded_messages, music_manager::NextReport};

/// Skip to the next song in the queue, starting playback if nothing is playing
#[poise::command(slash_command, category = "Music")]
pub async fn next(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;
    let Some(player) = connected_player(&ctx, guild_id).await? else {
        return Ok(());
    };

    let reply = match ctx.data().music.play_next(guild_id, player).await {
        Ok(NextReport::Skipped(track)) => embedded_messages::skipped(&track, false),
        Ok(NextReport::Started(track)) => embedded_messages::now_playing(&track),
        Ok(NextReport::QueueEmpty) => embedded_messages::nothing_to_play_next(),
        Ok(NextReport::AlreadyPlaying) => embedded_messages::already_playing(),
        Err(err) => embedded_messages::music_error(&err),
    };

    ctx.send(reply).await?;
    Ok(())
}
