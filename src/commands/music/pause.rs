use super::*;
use crate::commands::music::utils::{embedded_messages, playback::ControlOutcome};

/// Pause the current track
#[poise::command(slash_command, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;
    let Some(player) = connected_player(&ctx, guild_id).await? else {
        return Ok(());
    };

    let reply = match ctx.data().music.controller().pause(guild_id, player).await {
        Ok(ControlOutcome::Applied(track)) => embedded_messages::paused(&track),
        Ok(ControlOutcome::Ignored) => embedded_messages::nothing_to_pause(),
        Err(err) => embedded_messages::music_error(&err),
    };

    ctx.send(reply).await?;
    Ok(())
}
