use crate::commands::music::audio_sources::TrackMetadata;
use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use serenity::model::id::GuildId;
use std::collections::VecDeque;
use tracing::debug;

/// Pending tracks for one guild, in playback order.
#[derive(Debug, Default, Clone)]
pub struct GuildQueue {
    tracks: VecDeque<TrackMetadata>,
}

impl GuildQueue {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackMetadata> {
        self.tracks.iter()
    }
}

/// Manages the queue of tracks for each guild.
///
/// The only owner and mutator of queue contents. Queueing never starts playback;
/// that is the playback controller's job.
#[derive(Debug, Default)]
pub struct QueueManager {
    queues: DashMap<GuildId, GuildQueue>,
}

impl QueueManager {
    /// Create a new queue manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the queue for a guild, creating it on first access.
    ///
    /// The returned guard locks the guild's shard; do not hold it across an `.await`.
    pub fn get_queue(&self, guild_id: GuildId) -> RefMut<'_, GuildId, GuildQueue> {
        self.queues.entry(guild_id).or_default()
    }

    /// Append a track to the tail of the guild's queue. Returns the new queue length.
    pub fn enqueue(&self, guild_id: GuildId, track: TrackMetadata) -> usize {
        debug_assert!(
            !track.audio_url.is_empty(),
            "enqueued track without a stream URL"
        );

        let mut queue = self.get_queue(guild_id);
        debug!("Queued '{}' for guild {}", track.title, guild_id);
        queue.tracks.push_back(track);
        queue.len()
    }

    /// Remove and return the head of the guild's queue, or `None` when it is empty.
    pub fn dequeue(&self, guild_id: GuildId) -> Option<TrackMetadata> {
        self.get_queue(guild_id).tracks.pop_front()
    }

    /// Snapshot of the pending tracks, in playback order.
    pub fn peek_all(&self, guild_id: GuildId) -> Vec<TrackMetadata> {
        self.get_queue(guild_id).iter().cloned().collect()
    }

    /// Empty the guild's queue. The guild stays addressable afterwards.
    pub fn clear(&self, guild_id: GuildId) {
        self.get_queue(guild_id).tracks.clear();
    }

    /// Whether the guild has at least one pending track.
    pub fn has_pending(&self, guild_id: GuildId) -> bool {
        !self.get_queue(guild_id).is_empty()
    }

    /// Number of pending tracks for the guild.
    pub fn len(&self, guild_id: GuildId) -> usize {
        self.get_queue(guild_id).len()
    }
}
