use super::*;
use crate::commands::music::utils::{embedded_messages, music_manager::MusicError};
use tracing::{info, warn};

/// Add a song to the end of the queue without starting playback
#[poise::command(slash_command, category = "Music")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received add command with query: {}", query);
    let guild_id = require_guild(&ctx)?;

    ctx.defer().await?;

    let requested_by = ctx.author().display_name().to_string();

    let reply = match ctx
        .data()
        .music
        .add_query(guild_id, &query, &requested_by)
        .await
    {
        Ok((track, position)) => embedded_messages::added_to_queue(&track, position),
        Err(MusicError::NotFound(reason)) => {
            info!("No match for '{}': {}", query, reason);
            embedded_messages::could_not_find(&query)
        }
        Err(err) => {
            warn!("Add request '{}' failed in guild {}: {}", query, guild_id, err);
            embedded_messages::music_error(&err)
        }
    };

    ctx.send(reply).await?;
    Ok(())
}
