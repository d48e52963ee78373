//! Per-guild playback state machine.
//!
//! Three sources drive a guild's playback: commands, the background poller, and the
//! completion callback the `Player` fires when a stream ends. All of them go through
//! [`PlaybackController`], which serializes them with one mutex per guild.
//!
//! Every started stream gets a fresh generation number. A completion only advances the
//! queue if its generation is still current, so completions from a stream that was
//! cleared (leave) or already replaced (stall recovery) are ignored.

use dashmap::DashMap;
use serenity::async_trait;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::music_manager::MusicResult;
use super::queue_manager::QueueManager;
use crate::commands::music::audio_sources::TrackMetadata;

/// How a stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEnd {
    /// Reached the end or was stopped.
    Finished,
    /// The transport gave up on the stream.
    Failed(String),
}

/// Continuation handed to [`Player::play`].
pub type Completion = Box<dyn FnOnce(StreamEnd) + Send + 'static>;

/// Audio transport for one voice connection.
///
/// Contract: after `play` returns `Ok`, the player invokes `on_complete` exactly once,
/// when that stream ends, errors, or is stopped. It may do so on any thread, and may do
/// so synchronously from inside `stop`. When `play` returns `Err` no stream was started
/// and `on_complete` is dropped without being called.
#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self, track: &TrackMetadata, on_complete: Completion) -> MusicResult<()>;
    fn pause(&self) -> MusicResult<()>;
    fn resume(&self) -> MusicResult<()>;
    fn stop(&self) -> MusicResult<()>;
    async fn is_playing(&self) -> bool;
    async fn is_paused(&self) -> bool;
}

impl std::fmt::Debug for dyn Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Player")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing(TrackMetadata),
    Paused(TrackMetadata),
}

impl PlaybackState {
    pub fn current(&self) -> Option<&TrackMetadata> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Playing(track) | PlaybackState::Paused(track) => Some(track),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PlaybackState::Idle)
    }
}

/// Result of an attempt to get (or keep) audio flowing.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// A stream for this track was started.
    Started(TrackMetadata),
    /// Something is already playing or paused; nothing changed.
    AlreadyActive,
    /// Nothing to play; the guild is idle.
    QueueEmpty,
    /// A completion from a stream that is no longer current; ignored.
    Superseded,
    /// Another operation holds the guild; skipped without waiting.
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipOutcome {
    /// The current track was stopped. `queue_empty` tells whether anything follows it.
    Skipped {
        track: TrackMetadata,
        queue_empty: bool,
    },
    NothingPlaying,
}

/// Result of pause/resume; `Ignored` is an informational no-op, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    Applied(TrackMetadata),
    Ignored,
}

#[derive(Default)]
struct GuildPlayback {
    state: PlaybackState,
    generation: u64,
    /// The player that started the current stream. Only it may pause, stop or replace it.
    owner: Option<Arc<dyn Player>>,
}

impl GuildPlayback {
    /// The player the guild's current stream belongs to, falling back to `player`.
    fn active(&self, player: &Arc<dyn Player>) -> Arc<dyn Player> {
        self.owner.clone().unwrap_or_else(|| Arc::clone(player))
    }
}

/// Decides when each guild starts its next track. One instance per process.
pub struct PlaybackController {
    queues: Arc<QueueManager>,
    guilds: DashMap<GuildId, Arc<Mutex<GuildPlayback>>>,
}

impl PlaybackController {
    pub fn new(queues: Arc<QueueManager>) -> Self {
        Self {
            queues,
            guilds: DashMap::new(),
        }
    }

    pub fn queues(&self) -> &Arc<QueueManager> {
        &self.queues
    }

    fn slot(&self, guild_id: GuildId) -> Arc<Mutex<GuildPlayback>> {
        self.guilds.entry(guild_id).or_default().clone()
    }

    /// Snapshot of the guild's state for display.
    pub async fn state(&self, guild_id: GuildId) -> PlaybackState {
        self.slot(guild_id).lock().await.state.clone()
    }

    /// Start the next queued track unless the guild is already producing audio.
    ///
    /// Safe to call from any number of tasks at once; only one of them starts a stream.
    /// A guild whose state says playing but whose player has gone silent (a completion
    /// that never arrived) is treated as idle and moved on to its next track.
    ///
    /// Liveness is always asked of the player that started the current stream, so a
    /// second player handed in for the same guild cannot start a parallel stream.
    pub async fn ensure_playing(
        self: &Arc<Self>,
        guild_id: GuildId,
        player: Arc<dyn Player>,
    ) -> MusicResult<StartOutcome> {
        let slot = self.slot(guild_id);
        let mut entry = slot.lock().await;
        self.ensure_locked(&mut entry, guild_id, &player).await
    }

    /// Like [`ensure_playing`](Self::ensure_playing), but returns `Busy` instead of
    /// waiting when another operation holds the guild.
    pub async fn try_ensure_playing(
        self: &Arc<Self>,
        guild_id: GuildId,
        player: Arc<dyn Player>,
    ) -> MusicResult<StartOutcome> {
        let slot = self.slot(guild_id);
        let Ok(mut entry) = slot.try_lock() else {
            return Ok(StartOutcome::Busy);
        };
        self.ensure_locked(&mut entry, guild_id, &player).await
    }

    async fn ensure_locked(
        self: &Arc<Self>,
        entry: &mut GuildPlayback,
        guild_id: GuildId,
        player: &Arc<dyn Player>,
    ) -> MusicResult<StartOutcome> {
        let active = entry.active(player);
        if active.is_playing().await {
            return Ok(StartOutcome::AlreadyActive);
        }

        if let Some(track) = entry.state.current() {
            if active.is_paused().await {
                return Ok(StartOutcome::AlreadyActive);
            }
            warn!(
                "Stream for '{}' in guild {} stopped without a completion, recovering",
                track.title, guild_id
            );
            if !Arc::ptr_eq(&active, player) {
                // The silent stream lives on another player; make sure it stays silent.
                if let Err(e) = active.stop() {
                    warn!("Failed to stop previous player in guild {}: {}", guild_id, e);
                }
            }
        }

        self.start_next(entry, guild_id, player).await
    }

    /// Completion path: the stream of `generation` ended, move on to the next track.
    pub async fn advance(
        self: &Arc<Self>,
        guild_id: GuildId,
        player: Arc<dyn Player>,
        generation: u64,
    ) -> MusicResult<StartOutcome> {
        let slot = self.slot(guild_id);
        let mut entry = slot.lock().await;

        if entry.generation != generation || entry.state.is_idle() {
            debug!(
                "Ignoring completion of generation {} for guild {} (current {})",
                generation, guild_id, entry.generation
            );
            return Ok(StartOutcome::Superseded);
        }

        if player.is_playing().await {
            invariant_violation(guild_id, "stream still playing after its completion fired");
            return Ok(StartOutcome::AlreadyActive);
        }

        self.start_next(&mut entry, guild_id, &player).await
    }

    /// Dequeue and start tracks until one starts or the queue runs dry.
    async fn start_next(
        self: &Arc<Self>,
        entry: &mut GuildPlayback,
        guild_id: GuildId,
        player: &Arc<dyn Player>,
    ) -> MusicResult<StartOutcome> {
        while let Some(track) = self.queues.dequeue(guild_id) {
            entry.generation += 1;
            let on_complete = self.completion(guild_id, Arc::clone(player), entry.generation);

            match player.play(&track, on_complete).await {
                Ok(()) => {
                    info!("Now playing '{}' in guild {}", track.title, guild_id);
                    entry.state = PlaybackState::Playing(track.clone());
                    entry.owner = Some(Arc::clone(player));
                    return Ok(StartOutcome::Started(track));
                }
                Err(err) => {
                    error!(
                        "Failed to start '{}' in guild {}: {}, trying next track",
                        track.title, guild_id, err
                    );
                }
            }
        }

        if !entry.state.is_idle() {
            info!("Queue finished for guild {}", guild_id);
        }
        entry.state = PlaybackState::Idle;
        entry.owner = None;
        Ok(StartOutcome::QueueEmpty)
    }

    /// Builds the continuation for one stream. It never runs `advance` inline: the
    /// player may fire it from inside `stop`, while the guild lock is still held.
    fn completion(
        self: &Arc<Self>,
        guild_id: GuildId,
        player: Arc<dyn Player>,
        generation: u64,
    ) -> Completion {
        let controller = Arc::clone(self);
        let runtime = Handle::current();

        Box::new(move |end: StreamEnd| {
            match &end {
                StreamEnd::Finished => {
                    debug!("Stream {} finished in guild {}", generation, guild_id)
                }
                StreamEnd::Failed(reason) => warn!(
                    "Stream {} failed in guild {}: {}",
                    generation, guild_id, reason
                ),
            }

            runtime.spawn(async move {
                if let Err(err) = controller.advance(guild_id, player, generation).await {
                    error!("Failed to advance queue for guild {}: {}", guild_id, err);
                }
            });
        })
    }

    /// Stop the current track. The player's completion then advances the queue, so skip
    /// never dequeues by itself.
    pub async fn skip(
        &self,
        guild_id: GuildId,
        player: Arc<dyn Player>,
    ) -> MusicResult<SkipOutcome> {
        let slot = self.slot(guild_id);
        let entry = slot.lock().await;

        let Some(track) = entry.state.current().cloned() else {
            return Ok(SkipOutcome::NothingPlaying);
        };

        let queue_empty = !self.queues.has_pending(guild_id);
        entry.active(&player).stop()?;
        info!("Skipped '{}' in guild {}", track.title, guild_id);

        Ok(SkipOutcome::Skipped { track, queue_empty })
    }

    pub async fn pause(
        &self,
        guild_id: GuildId,
        player: Arc<dyn Player>,
    ) -> MusicResult<ControlOutcome> {
        let slot = self.slot(guild_id);
        let mut entry = slot.lock().await;

        let PlaybackState::Playing(track) = &entry.state else {
            return Ok(ControlOutcome::Ignored);
        };
        let track = track.clone();

        entry.active(&player).pause()?;
        entry.state = PlaybackState::Paused(track.clone());
        Ok(ControlOutcome::Applied(track))
    }

    pub async fn resume(
        &self,
        guild_id: GuildId,
        player: Arc<dyn Player>,
    ) -> MusicResult<ControlOutcome> {
        let slot = self.slot(guild_id);
        let mut entry = slot.lock().await;

        let PlaybackState::Paused(track) = &entry.state else {
            return Ok(ControlOutcome::Ignored);
        };
        let track = track.clone();

        entry.active(&player).resume()?;
        entry.state = PlaybackState::Playing(track.clone());
        Ok(ControlOutcome::Applied(track))
    }

    /// Stop playback, drop the queue and go idle. Any completion still in flight for the
    /// stopped stream is invalidated first.
    pub async fn stop_and_clear(
        &self,
        guild_id: GuildId,
        player: Arc<dyn Player>,
    ) -> MusicResult<()> {
        let slot = self.slot(guild_id);
        let mut entry = slot.lock().await;

        entry.generation += 1;
        let was_active = !entry.state.is_idle();
        let active = entry.owner.take().unwrap_or(player);
        entry.state = PlaybackState::Idle;
        self.queues.clear(guild_id);

        if was_active || active.is_playing().await || active.is_paused().await {
            active.stop()?;
        }

        info!("Stopped playback and cleared queue for guild {}", guild_id);
        Ok(())
    }
}

/// Programming errors: loud in debug builds, logged no-op in release builds.
fn invariant_violation(guild_id: GuildId, what: &str) {
    error!("Playback invariant violated in guild {}: {}", guild_id, what);
    debug_assert!(false, "playback invariant violated in guild {}: {}", guild_id, what);
}

