use super::*;
use crate::commands::music::utils::{embedded_messages, playback::SkipOutcome};

/// Skip the currently playing song
#[poise::command(slash_command, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;
    let Some(player) = connected_player(&ctx, guild_id).await? else {
        return Ok(());
    };

    let reply = match ctx.data().music.controller().skip(guild_id, player).await {
        Ok(SkipOutcome::Skipped { track, queue_empty }) => {
            embedded_messages::skipped(&track, queue_empty)
        }
        Ok(SkipOutcome::NothingPlaying) => embedded_messages::nothing_playing(),
        Err(err) => embedded_messages::music_error(&err),
    };

    ctx.send(reply).await?;
    Ok(())
}
