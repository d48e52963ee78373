pub mod add;
pub mod clear;
pub mod join;
pub mod leave;
pub mod next;
pub mod pause;
pub mod play;
pub mod queue;
pub mod resume;
pub mod skip;

pub mod audio_sources;
pub mod utils;

use crate::{CommandResult, Context};
use poise::serenity_prelude::GuildId;
use std::sync::Arc;
use utils::music_manager::MusicError;
use utils::playback::Player;

/// Every music slash command, in the order they are registered.
pub fn commands() -> Vec<poise::Command<crate::Data, crate::Error>> {
    vec![
        join::join(),
        leave::leave(),
        play::play(),
        add::add(),
        pause::pause(),
        resume::resume(),
        skip::skip(),
        next::next(),
        queue::queue(),
        clear::clear(),
    ]
}

fn require_guild(ctx: &Context<'_>) -> Result<GuildId, crate::Error> {
    ctx.guild_id().ok_or_else(|| {
        Box::new(MusicError::NotInGuild) as Box<dyn std::error::Error + Send + Sync>
    })
}

/// The guild's player, or a "not connected" reply already sent to the user.
async fn connected_player(
    ctx: &Context<'_>,
    guild_id: GuildId,
) -> Result<Option<Arc<dyn Player>>, crate::Error> {
    match ctx.data().music.player(guild_id) {
        Ok(player) => Ok(Some(player)),
        Err(err) => {
            ctx.send(utils::embedded_messages::music_error(&err)).await?;
            Ok(None)
        }
    }
}
