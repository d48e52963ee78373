//! Implements the `AudioApi` trait for Spotify track links.
//! Spotify is the catalog: it supplies the canonical title, artists, artwork and length.
//! The stream itself is found by searching YouTube for the same track.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use regex::Regex;
use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::HTTP_CLIENT;
use crate::commands::music::utils::music_manager::MusicError;
use crate::config::SpotifyCredentials;

use super::{AudioApi, SearchApi, TrackMetadata};

/// Result type specific to Spotify API operations.
pub type SpotifyResult<T> = Result<T, MusicError>;

const ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const API_URL: &str = "https://api.spotify.com";

/// Represents basic track information retrieved from Spotify.
#[derive(Clone, Debug, PartialEq)]
pub struct SpotifyTrack {
    /// The name of the track.
    pub name: String,
    /// A list of artist names associated with the track.
    pub artists: Vec<String>,
    /// Largest album cover, if any.
    pub artwork: Option<String>,
    pub duration: Duration,
    /// Link to the track on open.spotify.com.
    pub url: Option<String>,
}

/// Represents the response from Spotify's token endpoint.
#[derive(Debug, Serialize, Deserialize)]
struct SpotifyToken {
    /// The OAuth2 access token.
    access_token: String,
    /// The type of token (usually "Bearer").
    token_type: String,
    /// The duration in seconds for which the token is valid.
    expires_in: u64,
    /// The time when the token was created, used to check expiry.
    #[serde(skip, default = "Instant::now")]
    created_at: Instant,
}

impl SpotifyToken {
    /// Considers the token expired 30 seconds before its actual expiry time.
    fn is_expired(&self) -> bool {
        let expiry = Duration::from_secs(self.expires_in);
        self.created_at.elapsed() > expiry.saturating_sub(Duration::from_secs(30))
    }
}

/// Regex to match and capture Spotify track URLs.
static SPOTIFY_TRACK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(open\.spotify\.com|spotify)/(intl-[a-z]+/)?track/([a-zA-Z0-9]+)(\?.*)?$")
        .unwrap()
});

/// Regex to match any Spotify link (track, album, playlist, ...).
static SPOTIFY_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(https?://)?open\.spotify\.com/").unwrap());

/// Spotify catalog client combined with a stream search.
pub struct SpotifyApi {
    credentials: SpotifyCredentials,
    accounts_url: String,
    api_url: String,
    token: Mutex<Option<SpotifyToken>>,
    search: Arc<dyn SearchApi>,
}

impl SpotifyApi {
    pub fn new(credentials: SpotifyCredentials, search: Arc<dyn SearchApi>) -> Self {
        Self::with_endpoints(credentials, search, ACCOUNTS_URL, API_URL)
    }

    /// Points the client at alternative token and API hosts.
    pub fn with_endpoints(
        credentials: SpotifyCredentials,
        search: Arc<dyn SearchApi>,
        accounts_url: &str,
        api_url: &str,
    ) -> Self {
        Self {
            credentials,
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
            search,
        }
    }

    /// Checks if the provided URL points at open.spotify.com.
    pub fn is_spotify_url(url: &str) -> bool {
        SPOTIFY_URL_REGEX.is_match(url.trim())
    }

    /// Attempts to extract the Spotify track ID from a URL using the track regex.
    pub fn extract_track_id(url: &str) -> Option<String> {
        SPOTIFY_TRACK_REGEX
            .captures(url.trim())
            .and_then(|cap| cap.get(4))
            .map(|m| m.as_str().to_string())
    }

    /// Creates a YouTube search query string from Spotify track details
    /// (e.g., "Track Name by Artist1, Artist2 audio").
    pub fn get_youtube_search_query(track: &SpotifyTrack) -> String {
        if track.artists.is_empty() {
            return format!("{} audio", track.name);
        }
        format!("{} by {} audio", track.name, track.artists.join(", "))
    }

    /// Retrieves a valid access token, requesting a new one with the client credentials
    /// flow when the cached one is missing or about to expire.
    async fn get_access_token(&self) -> SpotifyResult<String> {
        let mut token_lock = self.token.lock().await;

        if let Some(token) = &*token_lock {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting a new Spotify access token");
        let auth = BASE64_STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));

        let response = HTTP_CLIENT
            .post(format!("{}/api/token", self.accounts_url))
            .header(header::AUTHORIZATION, format!("Basic {}", auth))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                MusicError::ExternalApiError(format!("Failed to request Spotify token: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Cannot read response".to_string());
            return Err(MusicError::ExternalApiError(format!(
                "Spotify token error: {} - {}",
                status, text
            )));
        }

        let token = response.json::<SpotifyToken>().await.map_err(|e| {
            MusicError::ExternalApiError(format!("Failed to parse Spotify token: {}", e))
        })?;

        let access_token = token.access_token.clone();
        *token_lock = Some(token);

        Ok(access_token)
    }

    /// Fetches catalog information for a single Spotify track by its ID.
    pub async fn get_track(&self, track_id: &str) -> SpotifyResult<SpotifyTrack> {
        let token = self.get_access_token().await?;

        let response = HTTP_CLIENT
            .get(format!("{}/v1/tracks/{}", self.api_url, track_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                MusicError::ExternalApiError(format!("Failed to request Spotify track: {}", e))
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                return Err(MusicError::NotFound(format!(
                    "Spotify track {} does not exist",
                    track_id
                )));
            }
            status => {
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Cannot read response".to_string());
                return Err(MusicError::ExternalApiError(format!(
                    "Spotify API error: {} - {}",
                    status, text
                )));
            }
        }

        let track_data: serde_json::Value = response.json().await.map_err(|e| {
            MusicError::ExternalApiError(format!("Failed to parse Spotify track data: {}", e))
        })?;

        Self::parse_track(&track_data)
    }

    fn parse_track(track_data: &serde_json::Value) -> SpotifyResult<SpotifyTrack> {
        let name = track_data["name"]
            .as_str()
            .ok_or_else(|| MusicError::ExternalApiError("Missing track name".to_string()))?
            .to_string();

        let artists = track_data["artists"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a["name"].as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        // Spotify lists album images largest first.
        let artwork = track_data["album"]["images"]
            .as_array()
            .and_then(|images| images.first())
            .and_then(|image| image["url"].as_str())
            .map(|s| s.to_string());

        let duration = track_data["duration_ms"]
            .as_u64()
            .map(|ms| Duration::from_secs((ms + 500) / 1000))
            .unwrap_or_default();

        let url = track_data["external_urls"]["spotify"]
            .as_str()
            .map(|s| s.to_string());

        Ok(SpotifyTrack {
            name,
            artists,
            artwork,
            duration,
            url,
        })
    }
}

#[async_trait]
impl AudioApi for SpotifyApi {
    fn is_valid_url(&self, url: &str) -> bool {
        SpotifyApi::is_spotify_url(url)
    }

    /// Looks the track up in the catalog, then finds a stream for it and merges the two:
    /// display fields from Spotify, the audio URL from the search result.
    async fn get_metadata(&self, url: &str) -> SpotifyResult<TrackMetadata> {
        info!("Creating audio source from Spotify URL: {}", url);

        let track_id = SpotifyApi::extract_track_id(url).ok_or_else(|| {
            MusicError::NotFound("Only Spotify track links can be played".to_string())
        })?;

        let track = self.get_track(&track_id).await?;
        let stream = self
            .search
            .search(&SpotifyApi::get_youtube_search_query(&track))
            .await?;

        let duration = if track.duration.is_zero() {
            stream.duration
        } else {
            track.duration
        };

        Ok(TrackMetadata::new(track.name, stream.audio_url)?
            .with_artist(track.artists.join(", "))
            .with_duration(duration)
            .with_thumbnail(track.artwork.or(stream.thumbnail))
            .with_source_url(stream.source_url)
            .with_page_url(track.url.or(stream.page_url)))
    }
}
