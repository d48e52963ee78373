use serenity::all::{ButtonStyle, CreateActionRow, CreateButton, ReactionType};

use super::playback::PlaybackState;
use crate::commands::music::audio_sources::TrackMetadata;

pub const PLAY_PAUSE: &str = "music_play_pause";
pub const SKIP: &str = "music_skip";
pub const STOP: &str = "music_stop";

/// Label and emoji of the play/pause button for a given state.
pub fn play_pause_face(state: &PlaybackState) -> (&'static str, &'static str) {
    match state {
        PlaybackState::Paused(_) => ("Resume", "▶️"),
        _ => ("Pause", "⏸️"),
    }
}

/// State to draw right after a skip. The queue advances asynchronously, so the
/// controller may still report the skipped track.
pub fn state_after_skip(skipped: &TrackMetadata, queue_empty: bool) -> PlaybackState {
    if queue_empty {
        PlaybackState::Idle
    } else {
        PlaybackState::Playing(skipped.clone())
    }
}

/// Creates a row of music control buttons reflecting the controller's current state
pub fn create_music_control_buttons(state: &PlaybackState) -> Vec<CreateActionRow> {
    let (label, emoji) = play_pause_face(state);
    let idle = state.is_idle();

    let play_pause = CreateButton::new(PLAY_PAUSE)
        .emoji(ReactionType::Unicode(emoji.to_string()))
        .style(ButtonStyle::Primary)
        .label(label)
        .disabled(idle);

    let stop = CreateButton::new(STOP)
        .emoji(ReactionType::Unicode("⏹️".to_string()))
        .style(ButtonStyle::Danger)
        .label("Stop")
        .disabled(idle);

    let skip = CreateButton::new(SKIP)
        .emoji(ReactionType::Unicode("⏭️".to_string()))
        .style(ButtonStyle::Secondary)
        .label("Skip")
        .disabled(idle);

    vec![CreateActionRow::Buttons(vec![play_pause, stop, skip])]
}
