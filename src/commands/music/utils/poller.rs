//! Periodic self-healing pass over every connected guild.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::playback::{PlaybackController, StartOutcome};
use super::voice_sessions::VoiceSessions;

/// Restarts playback for guilds whose completion chain broke (connected, queue non-empty,
/// player silent). Completions stay the primary driver; this only catches what they missed.
pub struct BackgroundPoller {
    controller: Arc<PlaybackController>,
    sessions: Arc<VoiceSessions>,
    interval: Duration,
}

impl BackgroundPoller {
    pub fn new(
        controller: Arc<PlaybackController>,
        sessions: Arc<VoiceSessions>,
        interval: Duration,
    ) -> Self {
        Self {
            controller,
            sessions,
            interval,
        }
    }

    /// One pass over all sessions. Guilds busy with another operation are skipped, not
    /// waited on. Returns how many guilds had playback started.
    pub async fn tick(&self) -> usize {
        let checks = self
            .sessions
            .snapshot()
            .into_iter()
            .map(|(guild_id, player)| async move {
                match self.controller.try_ensure_playing(guild_id, player).await {
                    Ok(StartOutcome::Started(track)) => {
                        info!("Poller restarted guild {} with '{}'", guild_id, track.title);
                        true
                    }
                    Ok(StartOutcome::Busy) => {
                        debug!("Poller skipped busy guild {}", guild_id);
                        false
                    }
                    Ok(_) => false,
                    Err(e) => {
                        error!("Poller failed for guild {}: {}", guild_id, e);
                        false
                    }
                }
            });

        join_all(checks).await.into_iter().filter(|started| *started).count()
    }

    /// Waits until `ready` turns true, then ticks every interval until `shutdown` fires.
    pub async fn run(self, mut ready: watch::Receiver<bool>, shutdown: CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Poller cancelled before the client became ready");
                return;
            }
            became_ready = async { ready.wait_for(|ready| *ready).await.is_ok() } => {
                if !became_ready {
                    warn!("Readiness channel closed, poller not started");
                    return;
                }
            }
        }

        info!("Background poller started, interval {:?}", self.interval);
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let started = self.tick().await;
                    if started > 0 {
                        debug!("Poller tick started playback in {} guild(s)", started);
                    }
                }
            }
        }

        info!("Background poller stopped");
    }
}
