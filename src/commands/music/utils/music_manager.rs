use poise::serenity_prelude as serenity;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::prelude::Mutex as SerenityMutex;
use songbird::{Call, Songbird};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::commands::music::audio_sources::{Resolver, TrackMetadata};

use super::playback::{PlaybackController, Player, SkipOutcome, StartOutcome};
use super::queue_manager::QueueManager;
use super::songbird_player::SongbirdPlayer;
use super::voice_sessions::VoiceSessions;

/// Errors that can occur during music operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("Could not find the song: {0}")]
    NotFound(String),

    #[error("Audio source error: {0}")]
    AudioSourceError(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Playback error: {0}")]
    PlaybackError(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// What `/play` did with the resolved track.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayReport {
    /// The queue was idle; this track started right away.
    NowPlaying(TrackMetadata),
    /// Something else is playing; the track waits at this 1-indexed position.
    Queued {
        track: TrackMetadata,
        position: usize,
    },
}

/// What `/next` did.
#[derive(Debug, Clone, PartialEq)]
pub enum NextReport {
    /// Nothing is waiting; the current track (if any) keeps playing.
    QueueEmpty,
    /// The current track was stopped; its completion starts the next one.
    Skipped(TrackMetadata),
    /// The guild was idle and the next track started right away.
    Started(TrackMetadata),
    /// Another request started playback first.
    AlreadyPlaying,
}

/// Ties the queue, the playback controller, the voice sessions and the resolver
/// together. One instance lives in the poise user data.
pub struct MusicManager {
    queues: Arc<QueueManager>,
    controller: Arc<PlaybackController>,
    sessions: Arc<VoiceSessions>,
    resolver: Arc<dyn Resolver>,
}

impl MusicManager {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        let queues = Arc::new(QueueManager::new());
        let controller = Arc::new(PlaybackController::new(Arc::clone(&queues)));

        Self {
            queues,
            controller,
            sessions: Arc::new(VoiceSessions::new()),
            resolver,
        }
    }

    pub fn queues(&self) -> &Arc<QueueManager> {
        &self.queues
    }

    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.controller
    }

    pub fn sessions(&self) -> &Arc<VoiceSessions> {
        &self.sessions
    }

    /// The player for the guild's live voice connection.
    pub fn player(&self, guild_id: GuildId) -> MusicResult<Arc<dyn Player>> {
        self.sessions.get(guild_id).ok_or(MusicError::NotConnected)
    }

    /// Resolve `query`, queue the result and make sure the guild is playing.
    ///
    /// Resolution runs before any playback state is touched, so a failed lookup leaves
    /// the queue and the controller exactly as they were.
    pub async fn enqueue_query(
        &self,
        guild_id: GuildId,
        player: Arc<dyn Player>,
        query: &str,
        requested_by: &str,
    ) -> MusicResult<PlayReport> {
        let track = self.resolver.resolve(query, requested_by).await?;

        // The guild may have been left (or left and rejoined) while the lookup ran.
        if !self.sessions.is_current(guild_id, &player) {
            info!(
                "Dropping '{}' for guild {}: voice session ended during lookup",
                track.title, guild_id
            );
            return Err(MusicError::NotConnected);
        }

        let position = self.queues.enqueue(guild_id, track.clone());
        info!(
            "Queued '{}' at position {} in guild {}",
            track.title, position, guild_id
        );

        let outcome = self
            .controller
            .ensure_playing(guild_id, Arc::clone(&player))
            .await?;

        if matches!(outcome, StartOutcome::Started(_))
            && !self.sessions.is_current(guild_id, &player)
        {
            // A leave slipped in between the check above and the start.
            self.controller.stop_and_clear(guild_id, player).await?;
            return Err(MusicError::NotConnected);
        }

        match outcome {
            StartOutcome::Started(started) if started == track => {
                Ok(PlayReport::NowPlaying(started))
            }
            StartOutcome::Started(started) => {
                // An older queued track started first; ours moved one slot closer.
                warn!(
                    "Guild {} was stalled, resumed with '{}'",
                    guild_id, started.title
                );
                Ok(PlayReport::Queued {
                    track,
                    position: position.saturating_sub(1).max(1),
                })
            }
            StartOutcome::QueueEmpty => Err(MusicError::PlaybackError(format!(
                "Could not start '{}'",
                track.title
            ))),
            _ => Ok(PlayReport::Queued { track, position }),
        }
    }

    /// Resolve `query` and append it to the guild's queue without starting playback.
    ///
    /// A connected guild picks the track up through its completions or the background
    /// poller; otherwise it waits for the next join.
    pub async fn add_query(
        &self,
        guild_id: GuildId,
        query: &str,
        requested_by: &str,
    ) -> MusicResult<(TrackMetadata, usize)> {
        let track = self.resolver.resolve(query, requested_by).await?;
        let position = self.queues.enqueue(guild_id, track.clone());
        info!(
            "Added '{}' at position {} in guild {}",
            track.title, position, guild_id
        );

        Ok((track, position))
    }

    /// Move on to the next queued track: skip the current one, or start playback if the
    /// guild is idle.
    pub async fn play_next(
        &self,
        guild_id: GuildId,
        player: Arc<dyn Player>,
    ) -> MusicResult<NextReport> {
        if !self.queues.has_pending(guild_id) {
            return Ok(NextReport::QueueEmpty);
        }

        match self
            .controller
            .skip(guild_id, Arc::clone(&player))
            .await?
        {
            SkipOutcome::Skipped { track, .. } => Ok(NextReport::Skipped(track)),
            SkipOutcome::NothingPlaying => {
                match self.controller.ensure_playing(guild_id, player).await? {
                    StartOutcome::Started(track) => Ok(NextReport::Started(track)),
                    StartOutcome::QueueEmpty => Ok(NextReport::QueueEmpty),
                    StartOutcome::AlreadyActive => Ok(NextReport::AlreadyPlaying),
                    other => Err(MusicError::PlaybackError(format!(
                        "Unexpected start outcome on an idle guild: {:?}",
                        other
                    ))),
                }
            }
        }
    }

    /// Join `channel_id` and register a player for the guild. Reuses an existing session;
    /// concurrent callers share one connection and one player.
    pub async fn connect(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MusicResult<Arc<dyn Player>> {
        self.sessions
            .get_or_connect(guild_id, move || async move {
                let call = Self::join_channel(ctx, guild_id, channel_id).await?;
                info!("Connected to channel {} in guild {}", channel_id, guild_id);
                Ok::<_, MusicError>(Arc::new(SongbirdPlayer::new(call)) as Arc<dyn Player>)
            })
            .await
    }

    /// Player for the guild, joining the user's voice channel first if needed.
    pub async fn connect_to_user(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        user_id: UserId,
    ) -> MusicResult<Arc<dyn Player>> {
        if let Some(player) = self.sessions.get(guild_id) {
            return Ok(player);
        }

        let channel_id = Self::get_user_voice_channel(ctx, guild_id, user_id)?;
        self.connect(ctx, guild_id, channel_id).await
    }

    /// Stop playback, clear the queue and leave the voice channel.
    pub async fn disconnect(&self, ctx: &Context, guild_id: GuildId) -> MusicResult<()> {
        let Some(player) = self.sessions.remove(guild_id) else {
            return Err(MusicError::NotConnected);
        };

        if let Err(e) = self.controller.stop_and_clear(guild_id, player).await {
            error!("Failed to stop playback in guild {}: {}", guild_id, e);
        }

        match Self::leave_channel(ctx, guild_id).await {
            // The call may already be gone (kicked, channel deleted).
            Err(MusicError::NotConnected) => Ok(()),
            result => result,
        }
    }

    /// Get the Songbird voice client from the context
    pub async fn get_songbird(ctx: &Context) -> MusicResult<Arc<Songbird>> {
        songbird::get(ctx).await.ok_or(MusicError::NoVoiceManager)
    }

    /// Join a voice channel
    pub async fn join_channel(
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MusicResult<Arc<SerenityMutex<Call>>> {
        let songbird = Self::get_songbird(ctx).await?;

        let handle = songbird.join(guild_id, channel_id).await.map_err(|e| {
            error!(
                "Failed to join voice channel {} for guild {}: {}",
                channel_id, guild_id, e
            );
            MusicError::JoinError(e.to_string())
        })?;

        Ok(handle)
    }

    /// Leave a voice channel
    pub async fn leave_channel(ctx: &Context, guild_id: GuildId) -> MusicResult<()> {
        let songbird = Self::get_songbird(ctx).await?;

        if songbird.get(guild_id).is_none() {
            return Err(MusicError::NotConnected);
        }

        songbird
            .remove(guild_id)
            .await
            .map_err(|_| MusicError::JoinError("Failed to leave voice channel".to_string()))?;

        Ok(())
    }

    /// Get the voice channel ID that the user is currently in
    pub fn get_user_voice_channel(
        ctx: &Context,
        guild_id: GuildId,
        user_id: UserId,
    ) -> MusicResult<ChannelId> {
        let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

        let voice_state = guild
            .voice_states
            .get(&user_id)
            .ok_or(MusicError::UserNotInVoiceChannel)?;

        voice_state
            .channel_id
            .ok_or(MusicError::UserNotInVoiceChannel)
    }
}
