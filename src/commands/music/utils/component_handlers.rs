use ::serenity::all::{ComponentInteraction, GuildId};
use poise::serenity_prelude::{self as serenity, Context};
use tracing::{error, info};

use super::button_controls::{self, create_music_control_buttons};
use super::embedded_messages;
use super::music_manager::MusicManager;
use super::playback::{ControlOutcome, PlaybackState, SkipOutcome};

type ButtonInteractionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Handle a button interaction
pub async fn handle_interaction(
    ctx: &Context,
    interaction: &ComponentInteraction,
    music: &MusicManager,
) -> ButtonInteractionResult {
    let guild_id = interaction.guild_id.ok_or("Not in a guild")?;

    // Defer the interaction response immediately
    interaction.defer(ctx).await?;

    if !music.sessions().contains(guild_id) {
        return error_followup(ctx, interaction, "I'm not in a voice channel.").await;
    }

    match interaction.data.custom_id.as_str() {
        button_controls::PLAY_PAUSE => handle_play_pause(ctx, interaction, guild_id, music).await?,
        button_controls::SKIP => handle_skip(ctx, interaction, guild_id, music).await?,
        button_controls::STOP => handle_stop(ctx, interaction, guild_id, music).await?,
        _ => {
            error!("Unknown button ID: {}", interaction.data.custom_id);
            error_followup(ctx, interaction, "Unknown button action.").await?;
        }
    }

    Ok(())
}

/// Handler for alternating Play/Pause button
async fn handle_play_pause(
    ctx: &Context,
    interaction: &ComponentInteraction,
    guild_id: GuildId,
    music: &MusicManager,
) -> ButtonInteractionResult {
    let player = music.player(guild_id)?;
    let controller = music.controller();

    let outcome = match controller.state(guild_id).await {
        PlaybackState::Playing(_) => controller.pause(guild_id, player).await?,
        PlaybackState::Paused(_) => controller.resume(guild_id, player).await?,
        PlaybackState::Idle => ControlOutcome::Ignored,
    };

    if outcome == ControlOutcome::Ignored {
        return error_followup(ctx, interaction, "Nothing is playing.").await;
    }

    let state = controller.state(guild_id).await;
    update_player_message(ctx, interaction, &state).await
}

/// Handler for Skip button
async fn handle_skip(
    ctx: &Context,
    interaction: &ComponentInteraction,
    guild_id: GuildId,
    music: &MusicManager,
) -> ButtonInteractionResult {
    let player = music.player(guild_id)?;

    match music.controller().skip(guild_id, player).await? {
        SkipOutcome::Skipped { track, queue_empty } => {
            info!("Skipped '{}' via button in guild {}", track.title, guild_id);
            let state = button_controls::state_after_skip(&track, queue_empty);
            update_player_message(ctx, interaction, &state).await?;
            followup(
                ctx,
                interaction,
                &embedded_messages::skip_message(&track, queue_empty),
            )
            .await
        }
        SkipOutcome::NothingPlaying => error_followup(ctx, interaction, "Nothing is playing.").await,
    }
}

/// Handler for Stop button: clears the queue but stays in the channel
async fn handle_stop(
    ctx: &Context,
    interaction: &ComponentInteraction,
    guild_id: GuildId,
    music: &MusicManager,
) -> ButtonInteractionResult {
    let player = music.player(guild_id)?;
    music.controller().stop_and_clear(guild_id, player).await?;

    update_player_message(ctx, interaction, &PlaybackState::Idle).await?;
    followup(ctx, interaction, "Playback stopped and queue cleared.").await
}

/// Redraw the buttons on the original player message for `state`
async fn update_player_message(
    ctx: &Context,
    interaction: &ComponentInteraction,
    state: &PlaybackState,
) -> ButtonInteractionResult {
    interaction
        .edit_response(
            &ctx.http,
            serenity::EditInteractionResponse::new()
                .components(create_music_control_buttons(state)),
        )
        .await?;

    Ok(())
}

async fn followup(
    ctx: &Context,
    interaction: &ComponentInteraction,
    content: &str,
) -> ButtonInteractionResult {
    interaction
        .create_followup(
            &ctx.http,
            serenity::CreateInteractionResponseFollowup::new().content(content),
        )
        .await?;
    Ok(())
}

/// Send an ephemeral error followup message for failed interactions
async fn error_followup(
    ctx: &Context,
    interaction: &ComponentInteraction,
    content: &str,
) -> ButtonInteractionResult {
    interaction
        .create_followup(
            &ctx.http,
            serenity::CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}
