use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::CreateEmbed;
use std::time::Duration;

use super::button_controls::create_music_control_buttons;
use super::format_duration;
use super::music_manager::MusicError;
use super::playback::PlaybackState;
use crate::commands::music::audio_sources::TrackMetadata;

const SUCCESS: u32 = 0x00ff00;
const FAILURE: u32 = 0xff0000;
const INFO: u32 = 0x5865f2;

fn error_embed(description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(description)
        .color(FAILURE)
}

fn info_reply(title: &str, description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(description)
            .color(INFO),
    )
}

fn track_link(metadata: &TrackMetadata) -> String {
    format!("[{}]({})", metadata.title, metadata.link())
}

fn with_track_fields(mut embed: CreateEmbed, metadata: &TrackMetadata) -> CreateEmbed {
    embed = embed
        .field("Artist", metadata.artist.as_str(), true)
        .field(
            "Duration",
            format!("`{}`", format_duration(metadata.duration)),
            true,
        );

    if let Some(requested_by) = &metadata.requested_by {
        embed = embed.field("Requested by", requested_by.as_str(), true);
    }
    if let Some(thumbnail) = &metadata.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

/// Create a reply for a track that started playing, with the control buttons attached
pub fn now_playing(metadata: &TrackMetadata) -> CreateReply {
    let embed = with_track_fields(
        CreateEmbed::new()
            .title("🎵 Now Playing")
            .description(track_link(metadata))
            .color(SUCCESS),
        metadata,
    );

    CreateReply::default()
        .embed(embed)
        .components(create_music_control_buttons(&PlaybackState::Playing(
            metadata.clone(),
        )))
}

/// Create a reply for a track that was added behind the current one
pub fn added_to_queue(metadata: &TrackMetadata, position: usize) -> CreateReply {
    let embed = with_track_fields(
        CreateEmbed::new()
            .title("🎵 Added to Queue")
            .description(track_link(metadata))
            .color(SUCCESS),
        metadata,
    )
    .field("Position", format!("`#{}`", position), true);

    CreateReply::default().embed(embed)
}

/// Body of the queue embed: the current track, then the pending tracks numbered from 1.
pub fn queue_description(current: Option<&TrackMetadata>, queue: &[TrackMetadata]) -> String {
    let mut description = String::new();

    match current {
        Some(metadata) => {
            description.push_str("**🎵 Now Playing**\n");
            description.push_str(&format!(
                "**{}** `{}`\n\n",
                track_link(metadata),
                format_duration(metadata.duration)
            ));
        }
        None => description.push_str("**🔇 Nothing playing**\n\n"),
    }

    if queue.is_empty() {
        description.push_str("**📭 Queue is empty**");
        return description;
    }

    description.push_str(&format!("**📋 Queue - {} tracks**\n", queue.len()));
    for (index, track) in queue.iter().enumerate() {
        description.push_str(&format!(
            "{}. {} `{}`\n",
            index + 1,
            track_link(track),
            format_duration(track.duration)
        ));
    }

    let total: Duration = queue.iter().map(|track| track.duration).sum();
    if !total.is_zero() {
        description.push_str(&format!(
            "\n**⏱️ Total Duration:** `{}`",
            format_duration(total)
        ));
    }

    description
}

/// Create an embed for the music queue
pub fn music_queue(state: &PlaybackState, queue: &[TrackMetadata]) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🎵 Music Queue")
            .description(queue_description(state.current(), queue))
            .color(SUCCESS),
    )
}

/// Text shown after a skip, depending on whether anything follows the skipped track.
pub fn skip_message(metadata: &TrackMetadata, queue_empty: bool) -> String {
    if queue_empty {
        format!(
            "Skipped {}. The queue is empty, playback stopped.",
            track_link(metadata)
        )
    } else {
        format!("Skipped {}", track_link(metadata))
    }
}

/// Create an embed for when a track is skipped
pub fn skipped(metadata: &TrackMetadata, queue_empty: bool) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏭️ Skipped")
            .description(skip_message(metadata, queue_empty))
            .color(SUCCESS),
    )
}

/// Create an embed for when a track is paused
pub fn paused(metadata: &TrackMetadata) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏸️ Paused")
            .description(format!("Paused {}", track_link(metadata)))
            .color(SUCCESS),
    )
}

/// Create an embed for when a track is resumed
pub fn resumed(metadata: &TrackMetadata) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("▶️ Resumed")
            .description(format!("Resumed {}", track_link(metadata)))
            .color(SUCCESS),
    )
}

pub fn nothing_playing() -> CreateReply {
    info_reply("🔇 Nothing Playing", "Nothing is playing")
}

pub fn nothing_to_pause() -> CreateReply {
    info_reply("🔇 Nothing to Pause", "Nothing is playing, so there is nothing to pause")
}

pub fn nothing_paused() -> CreateReply {
    info_reply("▶️ Nothing Paused", "Nothing is paused, so there is nothing to resume")
}

/// Create an embed for when the queue is empty
pub fn queue_is_empty() -> CreateReply {
    info_reply("📭 Queue Empty", "The queue is empty")
}

pub fn nothing_to_play_next() -> CreateReply {
    info_reply("📭 Queue Empty", "The queue is empty. There's nothing to play next")
}

pub fn already_playing() -> CreateReply {
    info_reply("🎵 Already Playing", "Playback already started")
}

pub fn queue_cleared(removed: usize) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🗑️ Queue Cleared")
            .description(format!("Removed {} track(s) from the queue", removed))
            .color(SUCCESS),
    )
}

/// Create an embed for when the bot stops playing music without leaving
pub fn stopped() -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏹️ Stopped")
            .description("Playback stopped and queue cleared")
            .color(SUCCESS),
    )
}

pub fn joined_voice_channel(channel: &str) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🔊 Joined Voice Channel")
            .description(format!("Connected to {}", channel))
            .color(SUCCESS),
    )
}

pub fn already_connected() -> CreateReply {
    info_reply("🔊 Already Connected", "I'm already connected to a voice channel")
}

/// Create an embed for when the bot leaves a voice channel
pub fn left_voice_channel() -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("👋 Left Voice Channel")
            .description("Successfully disconnected and cleared the queue")
            .color(SUCCESS),
    )
}

/// Create an embed for when the bot is not connected to a voice channel
pub fn bot_not_in_voice_channel() -> CreateReply {
    CreateReply::default().embed(error_embed("I'm not connected to a voice channel"))
}

/// Create an embed for when a user is not connected to a voice channel
pub fn user_not_in_voice_channel() -> CreateReply {
    CreateReply::default()
        .embed(error_embed("You need to be in a voice channel"))
        .ephemeral(true)
}

/// Create an embed for when the bot fails to join a voice channel
pub fn failed_to_join_voice_channel(err: &MusicError) -> CreateReply {
    CreateReply::default().embed(error_embed(format!(
        "Failed to join voice channel: {}",
        err
    )))
}

pub fn could_not_find(query: &str) -> CreateReply {
    CreateReply::default().embed(error_embed(format!(
        "Could not find the song `{}`",
        query
    )))
}

/// Maps a domain error to the reply a user sees.
pub fn music_error(err: &MusicError) -> CreateReply {
    match err {
        MusicError::UserNotInVoiceChannel => user_not_in_voice_channel(),
        MusicError::NotConnected => bot_not_in_voice_channel(),
        MusicError::JoinError(_) => failed_to_join_voice_channel(err),
        MusicError::Timeout(limit) => CreateReply::default().embed(error_embed(format!(
            "Looking up the song took longer than {}s",
            limit.as_secs()
        ))),
        other => generic_error(&other.to_string()),
    }
}

pub fn generic_error(description: &str) -> CreateReply {
    CreateReply::default().embed(error_embed(description))
}
