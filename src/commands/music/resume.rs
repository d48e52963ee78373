use super::*;
use crate::commands::music::utils::{embedded_messages, playback::ControlOutcome};

/// Resume the paused track
#[poise::command(slash_command, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let guild_id = require_guild(&ctx)?;
    let Some(player) = connected_player(&ctx, guild_id).await? else {
        return Ok(());
    };

    let reply = match ctx.data().music.controller().resume(guild_id, player).await {
        Ok(ControlOutcome::Applied(track)) => embedded_messages::resumed(&track),
        Ok(ControlOutcome::Ignored) => embedded_messages::nothing_paused(),
        Err(err) => embedded_messages::music_error(&err),
    };

    ctx.send(reply).await?;
    Ok(())
}
