//! Defines the `TrackMetadata` struct, the resolved, playable description of a track,
//! and the conversion from `yt-dlp` JSON output.

use crate::commands::music::utils::music_manager::MusicError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Artist shown when no source could name one.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Unified representation of metadata for a playable track.
///
/// A value only exists once resolution succeeded, so `audio_url` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackMetadata {
    /// The title of the track.
    pub title: String,
    /// Performing artist, or [`UNKNOWN_ARTIST`].
    pub artist: String,
    /// Directly streamable audio URL. Such URLs are often signed and expire.
    pub audio_url: String,
    /// Length of the track, whole seconds.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail: Option<String>,
    /// Human-facing page for the track (e.g. the YouTube watch page).
    pub page_url: Option<String>,
    /// Page `yt-dlp` can extract a fresh stream from when the track starts.
    #[serde(default)]
    pub source_url: Option<String>,
    /// The name of the user who requested the track.
    pub requested_by: Option<String>,
}

impl TrackMetadata {
    /// Creates metadata for a stream URL. An empty URL means nothing playable was found.
    pub fn new(title: impl Into<String>, audio_url: impl Into<String>) -> Result<Self, MusicError> {
        let title = title.into();
        let audio_url = audio_url.into();

        if audio_url.trim().is_empty() {
            return Err(MusicError::NotFound(format!("no audio stream for '{}'", title)));
        }

        Ok(Self {
            title,
            artist: UNKNOWN_ARTIST.to_string(),
            audio_url,
            duration: Duration::ZERO,
            thumbnail: None,
            page_url: None,
            source_url: None,
            requested_by: None,
        })
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        let artist = artist.into();
        if !artist.trim().is_empty() {
            self.artist = artist;
        }
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Duration::from_secs(duration.as_secs());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn with_page_url(mut self, page_url: Option<String>) -> Self {
        self.page_url = page_url;
        self
    }

    pub fn with_source_url(mut self, source_url: Option<String>) -> Self {
        self.source_url = source_url;
        self
    }

    pub fn with_requester(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = Some(requested_by.into());
        self
    }

    /// The best link to show a user: the page if known, otherwise the stream itself.
    pub fn link(&self) -> &str {
        self.page_url.as_deref().unwrap_or(&self.audio_url)
    }

    /// Parses the output of `yt-dlp -j`, taking the first JSON document printed.
    pub fn from_ytdlp_output(stdout: &[u8]) -> Result<Self, MusicError> {
        let output = String::from_utf8_lossy(stdout);
        let first = output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| MusicError::NotFound("yt-dlp returned no results".to_string()))?;

        let json: serde_json::Value = serde_json::from_str(first).map_err(|e| {
            MusicError::AudioSourceError(format!("Failed to parse video metadata: {}", e))
        })?;

        Self::try_from(json)
    }
}

/// Converts one `yt-dlp --dump-json` document into `TrackMetadata`.
impl TryFrom<serde_json::Value> for TrackMetadata {
    type Error = MusicError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let title = value["title"].as_str().unwrap_or("Unknown Title");

        // `url` is only present when a single format was selected.
        let audio_url = value["url"].as_str().unwrap_or_default();

        let artist = ["artist", "creator", "uploader", "channel"]
            .iter()
            .find_map(|key| value[*key].as_str())
            .unwrap_or(UNKNOWN_ARTIST);

        let duration = value["duration"]
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| Duration::from_secs(secs.round() as u64))
            .unwrap_or_default();

        let thumbnail = value["thumbnail"].as_str().map(|s| s.to_string());
        let page_url = value["webpage_url"].as_str().map(|s| s.to_string());

        Ok(TrackMetadata::new(title, audio_url)?
            .with_artist(artist)
            .with_duration(duration)
            .with_thumbnail(thumbnail)
            .with_source_url(page_url.clone())
            .with_page_url(page_url))
    }
}
