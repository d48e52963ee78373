//! Implements the `AudioApi` and `SearchApi` traits for YouTube.
//! Uses the `yt-dlp` command-line tool for extracting information and stream URLs.

use crate::commands::music::utils::music_manager::MusicError;
use serenity::async_trait;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use super::{AudioApi, AudioSourceResult, SearchApi, TrackMetadata};

/// The main struct implementing YouTube API logic (via `yt-dlp`).
#[derive(Debug, Clone)]
pub struct YoutubeApi {
    ytdlp_path: String,
}

impl Default for YoutubeApi {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YoutubeApi {
    pub fn new(ytdlp_path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
        }
    }

    /// Checks if the input string is a YouTube video URL (watch page, short link, shorts
    /// or YouTube Music).
    pub fn is_youtube_url(query: &str) -> bool {
        let Ok(url) = Url::parse(query.trim()) else {
            return false;
        };

        match url.host_str() {
            Some("youtu.be") => url.path().len() > 1,
            Some("www.youtube.com" | "youtube.com" | "m.youtube.com" | "music.youtube.com") => {
                url.path().starts_with("/watch") || url.path().starts_with("/shorts/")
            }
            _ => false,
        }
    }

    /// Fetches metadata for the first YouTube search result for a given search term.
    pub async fn from_search(&self, search_term: &str) -> AudioSourceResult<TrackMetadata> {
        info!("Searching YouTube for: {}", search_term);
        self.extract(&format!("ytsearch1:{}", search_term)).await
    }

    /// Runs `yt-dlp` against a URL or `ytsearch` target and parses the first result.
    async fn extract(&self, target: &str) -> AudioSourceResult<TrackMetadata> {
        let output = Command::new(&self.ytdlp_path)
            .args([
                "-j",            // Output as JSON
                "--no-playlist", // Don't process playlists
                "--no-warnings",
                "-f",
                "bestaudio/best",
                target,
            ])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MusicError::AudioSourceError(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() && output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp failed for {}: {}", target, stderr.trim());
            return Err(MusicError::AudioSourceError(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or_default()
            )));
        }

        TrackMetadata::from_ytdlp_output(&output.stdout)
    }
}

#[async_trait]
impl AudioApi for YoutubeApi {
    fn is_valid_url(&self, url: &str) -> bool {
        YoutubeApi::is_youtube_url(url)
    }

    async fn get_metadata(&self, url: &str) -> AudioSourceResult<TrackMetadata> {
        info!("Creating YouTube audio source for URL: {}", url);
        self.extract(url).await
    }
}

#[async_trait]
impl SearchApi for YoutubeApi {
    async fn search(&self, query: &str) -> AudioSourceResult<TrackMetadata> {
        self.from_search(query).await
    }
}
