use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::playback::Player;

/// Live voice connections, one `Player` per guild.
///
/// Filled on join and emptied on leave; the background poller walks it to find the
/// guilds it should keep playing.
#[derive(Default)]
pub struct VoiceSessions {
    players: DashMap<GuildId, Arc<dyn Player>>,
    connecting: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl VoiceSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The guild's player, or a new one from `connect` if there is none yet.
    ///
    /// Concurrent callers for one guild are serialized: `connect` runs at most once per
    /// missing session and every caller gets the same player back.
    pub async fn get_or_connect<F, Fut, E>(
        &self,
        guild_id: GuildId,
        connect: F,
    ) -> Result<Arc<dyn Player>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Player>, E>>,
    {
        if let Some(player) = self.get(guild_id) {
            return Ok(player);
        }

        let gate = self.connecting.entry(guild_id).or_default().clone();
        let _guard = gate.lock().await;

        if let Some(player) = self.get(guild_id) {
            debug!("Guild {} was connected while waiting", guild_id);
            return Ok(player);
        }

        let player = connect().await?;
        self.insert(guild_id, Arc::clone(&player));
        Ok(player)
    }

    /// Whether `player` is still the guild's registered player.
    pub fn is_current(&self, guild_id: GuildId, player: &Arc<dyn Player>) -> bool {
        self.players
            .get(&guild_id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), player))
    }

    pub fn insert(&self, guild_id: GuildId, player: Arc<dyn Player>) {
        info!("Registered voice session for guild {}", guild_id);
        self.players.insert(guild_id, player);
    }

    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<dyn Player>> {
        self.players.remove(&guild_id).map(|(_, player)| player)
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<dyn Player>> {
        self.players.get(&guild_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.players.contains_key(&guild_id)
    }

    /// Snapshot of every connected guild with its player. Holds no map lock afterwards.
    pub fn snapshot(&self) -> Vec<(GuildId, Arc<dyn Player>)> {
        self.players
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
