//! Runtime configuration, read from the process environment (and `.env`).

use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_YTDLP_PATH: &str = "yt-dlp";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET must be set together")]
    PartialSpotifyCredentials,
}

/// Spotify client-credentials pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub discord_token: String,
    /// `None` disables Spotify URL resolution.
    pub spotify: Option<SpotifyCredentials>,
    /// Period of the background playback poller.
    pub poll_interval: Duration,
    /// Upper bound on a single query resolution.
    pub resolve_timeout: Duration,
    pub ytdlp_path: String,
}

impl Config {
    /// Load `.env` (if present) and read the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let discord_token =
            non_empty("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let spotify = match (
            non_empty("SPOTIFY_CLIENT_ID"),
            non_empty("SPOTIFY_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
                client_id,
                client_secret,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialSpotifyCredentials),
        };

        let poll_interval = Self::seconds(
            "POLL_INTERVAL_SECS",
            non_empty("POLL_INTERVAL_SECS"),
            DEFAULT_POLL_INTERVAL_SECS,
        )?;
        let resolve_timeout = Self::seconds(
            "RESOLVE_TIMEOUT_SECS",
            non_empty("RESOLVE_TIMEOUT_SECS"),
            DEFAULT_RESOLVE_TIMEOUT_SECS,
        )?;

        let ytdlp_path = non_empty("YTDLP_PATH").unwrap_or_else(|| DEFAULT_YTDLP_PATH.to_string());

        Ok(Self {
            discord_token,
            spotify,
            poll_interval,
            resolve_timeout,
            ytdlp_path,
        })
    }

    /// Parse a strictly positive number of seconds, falling back to `default` when unset.
    fn seconds(
        name: &'static str,
        value: Option<String>,
        default: u64,
    ) -> Result<Duration, ConfigError> {
        let Some(value) = value else {
            return Ok(Duration::from_secs(default));
        };

        match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid { name, value }),
        }
    }
}
