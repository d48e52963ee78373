//! `Player` over a songbird `Call`: one track handle at a time, completion fired from
//! songbird's track events.

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::prelude::Mutex as SerenityMutex;
use songbird::input::{HttpRequest, Input, YoutubeDl};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Call, Event, EventContext, EventHandler, TrackEvent};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::music_manager::{MusicError, MusicResult};
use super::playback::{Completion, Player, StreamEnd};
use crate::HTTP_CLIENT;
use crate::commands::music::audio_sources::TrackMetadata;

/// Where a track's audio is read from when it starts.
#[derive(Debug, PartialEq)]
enum StreamSource<'a> {
    /// Re-extracted by `yt-dlp` at play time; queued tracks outlive signed stream URLs.
    Extract(&'a str),
    /// Read straight from the resolved stream URL.
    Direct(&'a str),
}

impl<'a> StreamSource<'a> {
    fn for_track(track: &'a TrackMetadata) -> Self {
        match track.source_url.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => StreamSource::Extract(url),
            None => StreamSource::Direct(&track.audio_url),
        }
    }

    fn into_input(self) -> Input {
        match self {
            StreamSource::Extract(url) => {
                YoutubeDl::new(HTTP_CLIENT.clone(), url.to_string()).into()
            }
            StreamSource::Direct(url) => {
                HttpRequest::new(HTTP_CLIENT.clone(), url.to_string()).into()
            }
        }
    }
}

/// Streams tracks into one guild's voice call.
pub struct SongbirdPlayer {
    call: Arc<SerenityMutex<Call>>,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdPlayer {
    pub fn new(call: Arc<SerenityMutex<Call>>) -> Self {
        Self {
            call,
            current: Mutex::new(None),
        }
    }

    fn handle(&self) -> Option<TrackHandle> {
        self.current.lock().ok().and_then(|current| current.clone())
    }

    async fn play_mode(&self) -> Option<PlayMode> {
        let handle = self.handle()?;
        handle.get_info().await.ok().map(|info| info.playing)
    }
}

#[async_trait]
impl Player for SongbirdPlayer {
    async fn play(&self, track: &TrackMetadata, on_complete: Completion) -> MusicResult<()> {
        let input = StreamSource::for_track(track).into_input();
        let handle = self.call.lock().await.play_input(input);

        let notifier = TrackEndNotifier {
            on_complete: Arc::new(Mutex::new(Some(on_complete))),
        };

        for event in [TrackEvent::End, TrackEvent::Error] {
            if let Err(e) = handle.add_event(Event::Track(event), notifier.clone()) {
                // No stream may outlive a failed play.
                let _ = handle.stop();
                return Err(MusicError::PlaybackError(format!(
                    "Failed to attach track events: {}",
                    e
                )));
            }
        }

        debug!("Started stream for '{}'", track.title);
        if let Ok(mut current) = self.current.lock() {
            *current = Some(handle);
        }
        Ok(())
    }

    fn pause(&self) -> MusicResult<()> {
        let handle = self.handle().ok_or(MusicError::NotConnected)?;
        handle
            .pause()
            .map_err(|e| MusicError::PlaybackError(e.to_string()))
    }

    fn resume(&self) -> MusicResult<()> {
        let handle = self.handle().ok_or(MusicError::NotConnected)?;
        handle
            .play()
            .map_err(|e| MusicError::PlaybackError(e.to_string()))
    }

    fn stop(&self) -> MusicResult<()> {
        let handle = match self.current.lock() {
            Ok(mut current) => current.take(),
            Err(_) => None,
        };

        match handle {
            // A track that already ended rejects the command; nothing left to stop.
            Some(handle) => {
                if let Err(e) = handle.stop() {
                    debug!("Stop on finished track ignored: {}", e);
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn is_playing(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Play))
    }

    async fn is_paused(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Pause))
    }
}

/// Fires a stream's completion once, whichever of end or error songbird reports first.
#[derive(Clone)]
struct TrackEndNotifier {
    on_complete: Arc<Mutex<Option<Completion>>>,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(tracks) = ctx else {
            return None;
        };

        let end = match tracks.first().map(|(state, _)| &state.playing) {
            Some(PlayMode::Errored(e)) => StreamEnd::Failed(format!("{:?}", e)),
            _ => StreamEnd::Finished,
        };

        let completion = self.on_complete.lock().ok().and_then(|mut slot| slot.take());
        match completion {
            Some(on_complete) => on_complete(end),
            None => warn!("Track event after completion already fired: {:?}", end),
        }

        Some(Event::Cancel)
    }
}
