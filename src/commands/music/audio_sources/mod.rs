//! This module defines the structure and traits for resolving a user query to a
//! playable track. It includes implementations for specific sources like YouTube and
//! Spotify, and the `QueryResolver` that picks between them.

/// Submodule implementing the `AudioApi` trait for Spotify.
pub mod spotify;
/// Submodule defining the `TrackMetadata` struct used across audio sources.
pub mod track_metadata;
/// Submodule implementing the `AudioApi` and `SearchApi` traits for YouTube.
pub mod youtube;

pub use track_metadata::TrackMetadata;

use crate::commands::music::utils::music_manager::MusicError;
use serenity::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, MusicError>;

/// Maps a free-text or URL query to playable metadata.
///
/// `MusicError::NotFound` is the "nothing matched" answer; any other error means the
/// lookup itself failed. Implementations may be slow and must be called outside any
/// playback lock.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, query: &str, requested_by: &str) -> AudioSourceResult<TrackMetadata>;
}

/// Trait defining the common interface for URL-based audio source APIs (e.g., YouTube, Spotify).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioApi: Send + Sync {
    /// Checks if the given URL string is recognized by this specific audio API implementation.
    fn is_valid_url(&self, url: &str) -> bool;

    /// Fetches metadata for the track behind the given URL.
    async fn get_metadata(&self, url: &str) -> AudioSourceResult<TrackMetadata>;
}

/// Free-text search returning the best playable match.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, query: &str) -> AudioSourceResult<TrackMetadata>;
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Performs a basic check if the input string can be parsed as an http(s) URL.
    /// Does not validate if the URL is actually reachable or supported by any specific API.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input.trim()).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }
}

/// The production `Resolver`: URLs go to the first API that claims them, anything else
/// is searched for.
pub struct QueryResolver {
    apis: Vec<Arc<dyn AudioApi>>,
    search: Arc<dyn SearchApi>,
    timeout: Duration,
}

impl QueryResolver {
    pub fn new(apis: Vec<Arc<dyn AudioApi>>, search: Arc<dyn SearchApi>, timeout: Duration) -> Self {
        Self {
            apis,
            search,
            timeout,
        }
    }

    async fn lookup(&self, query: &str) -> AudioSourceResult<TrackMetadata> {
        if AudioSource::is_url(query) {
            let api = self
                .apis
                .iter()
                .find(|api| api.is_valid_url(query))
                .ok_or_else(|| {
                    MusicError::NotFound(format!(
                        "Unable to resolve URL to valid provider: {}",
                        query
                    ))
                })?;
            return api.get_metadata(query).await;
        }

        self.search.search(query).await
    }
}

#[async_trait]
impl Resolver for QueryResolver {
    async fn resolve(&self, query: &str, requested_by: &str) -> AudioSourceResult<TrackMetadata> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MusicError::NotFound("empty query".to_string()));
        }

        info!("Resolving query: {}", query);
        let metadata = match tokio::time::timeout(self.timeout, self.lookup(query)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Resolving '{}' timed out after {:?}", query, self.timeout);
                return Err(MusicError::Timeout(self.timeout));
            }
        };

        debug!("Resolved '{}' to '{}'", query, metadata.title);
        Ok(metadata.with_requester(requested_by))
    }
}
