use assert_matches::assert_matches;
use jukebox::commands::music::utils::playback::{
    ControlOutcome, PlaybackController, PlaybackState, Player, SkipOutcome, StartOutcome,
    StreamEnd,
};
use jukebox::commands::music::utils::queue_manager::QueueManager;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use std::sync::Arc;
use tokio_test::assert_ok;

use crate::common::fixtures::{guild, stream_url, track, tracks};
use crate::common::mocks::{FakePlayer, Mode};
use crate::common::settle;
use crate::test_utils;

struct Harness {
    queues: Arc<QueueManager>,
    controller: Arc<PlaybackController>,
    player: Arc<FakePlayer>,
}

impl Harness {
    fn player(&self) -> Arc<dyn Player> {
        self.player.clone()
    }

    async fn ensure(&self) -> StartOutcome {
        assert_ok!(self.controller.ensure_playing(guild(), self.player()).await)
    }

    async fn state(&self) -> PlaybackState {
        self.controller.state(guild()).await
    }
}

#[fixture]
fn harness() -> Harness {
    test_utils::init();
    let queues = Arc::new(QueueManager::new());
    Harness {
        controller: Arc::new(PlaybackController::new(Arc::clone(&queues))),
        queues,
        player: FakePlayer::new(),
    }
}

/// Three queued tracks drain in order through their completions and the guild ends idle
#[rstest]
#[tokio::test]
async fn test_queue_drains_to_idle(harness: Harness) {
    // Arrange
    let queued = tracks(3);
    for t in &queued {
        harness.queues.enqueue(guild(), t.clone());
    }

    // Act
    assert_eq!(harness.ensure().await, StartOutcome::Started(queued[0].clone()));
    for _ in 0..3 {
        harness.player.finish();
        settle().await;
    }

    // Assert
    let titles: Vec<String> = queued.iter().map(|t| t.title.clone()).collect();
    assert_eq!(harness.player.played(), titles);
    assert_eq!(harness.state().await, PlaybackState::Idle);
    assert!(!harness.queues.has_pending(guild()));
    assert_eq!(harness.player.overlapping_plays(), 0);
}

/// Skipping the last track stops it once and leaves the guild idle without another play
#[rstest]
#[tokio::test]
async fn test_skip_with_empty_queue_goes_idle(harness: Harness) {
    // Arrange
    let only = track("only");
    harness.queues.enqueue(guild(), only.clone());
    harness.ensure().await;

    // Act
    let outcome = assert_ok!(harness.controller.skip(guild(), harness.player()).await);
    settle().await;

    // Assert
    assert_eq!(
        outcome,
        SkipOutcome::Skipped {
            track: only,
            queue_empty: true
        }
    );
    assert_eq!(harness.player.stops(), 1);
    assert_eq!(harness.player.play_count(), 1);
    assert_eq!(harness.state().await, PlaybackState::Idle);
}

/// Skip advances through the completion only, so nothing is dequeued twice
#[rstest]
#[tokio::test]
async fn test_skip_plays_next_track_exactly_once(harness: Harness) {
    // Arrange
    let queued = tracks(3);
    for t in &queued {
        harness.queues.enqueue(guild(), t.clone());
    }
    harness.ensure().await;

    // Act
    let outcome = assert_ok!(harness.controller.skip(guild(), harness.player()).await);
    settle().await;

    // Assert
    assert_matches!(outcome, SkipOutcome::Skipped { queue_empty: false, .. });
    assert_eq!(
        harness.player.played(),
        vec![queued[0].title.clone(), queued[1].title.clone()]
    );
    assert_eq!(harness.state().await, PlaybackState::Playing(queued[1].clone()));
    assert_eq!(harness.queues.peek_all(guild()), vec![queued[2].clone()]);
}

/// Skip from a paused track moves on to the next one
#[rstest]
#[tokio::test]
async fn test_skip_while_paused_advances(harness: Harness) {
    let queued = tracks(2);
    for t in &queued {
        harness.queues.enqueue(guild(), t.clone());
    }
    harness.ensure().await;
    assert_ok!(harness.controller.pause(guild(), harness.player()).await);

    assert_ok!(harness.controller.skip(guild(), harness.player()).await);
    settle().await;

    assert_eq!(harness.state().await, PlaybackState::Playing(queued[1].clone()));
    assert_eq!(harness.player.mode(), Mode::Playing);
}

#[rstest]
#[tokio::test]
async fn test_skip_while_idle_reports_nothing_playing(harness: Harness) {
    let outcome = assert_ok!(harness.controller.skip(guild(), harness.player()).await);

    assert_eq!(outcome, SkipOutcome::NothingPlaying);
    assert_eq!(harness.player.stops(), 0);
}

/// Resume while idle and pause while paused change nothing and never reach the player
#[rstest]
#[tokio::test]
async fn test_pause_and_resume_outside_their_states_are_no_ops(harness: Harness) {
    // Resume while idle
    let outcome = assert_ok!(harness.controller.resume(guild(), harness.player()).await);
    assert_eq!(outcome, ControlOutcome::Ignored);
    assert_eq!(harness.player.resumes(), 0);
    assert_eq!(harness.state().await, PlaybackState::Idle);

    // Pause while paused
    let song = track("song");
    harness.queues.enqueue(guild(), song.clone());
    harness.ensure().await;

    let first = assert_ok!(harness.controller.pause(guild(), harness.player()).await);
    let second = assert_ok!(harness.controller.pause(guild(), harness.player()).await);

    assert_eq!(first, ControlOutcome::Applied(song.clone()));
    assert_eq!(second, ControlOutcome::Ignored);
    assert_eq!(harness.player.pauses(), 1);
    assert_eq!(harness.state().await, PlaybackState::Paused(song.clone()));

    // Resume brings it back
    let resumed = assert_ok!(harness.controller.resume(guild(), harness.player()).await);
    assert_eq!(resumed, ControlOutcome::Applied(song.clone()));
    assert_eq!(harness.state().await, PlaybackState::Playing(song));
}

/// Two concurrent starts with one track queued produce exactly one stream
#[rstest]
#[tokio::test]
async fn test_concurrent_ensure_playing_starts_once(harness: Harness) {
    // Arrange
    let song = track("song");
    harness.queues.enqueue(guild(), song.clone());

    // Act
    let (first, second) = tokio::join!(
        harness.controller.ensure_playing(guild(), harness.player()),
        harness.controller.ensure_playing(guild(), harness.player()),
    );

    // Assert
    let outcomes = [assert_ok!(first), assert_ok!(second)];
    let started = outcomes
        .iter()
        .filter(|o| matches!(o, StartOutcome::Started(_)))
        .count();
    assert_eq!(started, 1);
    assert!(outcomes.contains(&StartOutcome::AlreadyActive));
    assert_eq!(harness.player.play_count(), 1);
    assert_eq!(harness.state().await, PlaybackState::Playing(song));
}

/// Concurrent starts racing with completions never overlap two streams
#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_overlapping_streams_under_contention(harness: Harness) {
    let queued = tracks(8);
    for t in &queued {
        harness.queues.enqueue(guild(), t.clone());
    }

    let harness = Arc::new(harness);
    for _ in 0..8 {
        let starters: Vec<_> = (0..4)
            .map(|_| {
                let controller = Arc::clone(&harness.controller);
                let player = harness.player();
                tokio::spawn(async move { controller.ensure_playing(guild(), player).await })
            })
            .collect();
        for starter in starters {
            assert_ok!(assert_ok!(starter.await));
        }
        harness.player.finish();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert_eq!(harness.player.overlapping_plays(), 0);
    assert_eq!(harness.player.play_count(), 8);
}

/// A completion that arrives after leave and rejoin cannot advance the new session
#[rstest]
#[tokio::test]
async fn test_stale_completion_after_stop_and_clear_is_ignored(harness: Harness) {
    // Arrange
    let first = track("first");
    let dropped = track("dropped");
    harness.queues.enqueue(guild(), first.clone());
    harness.queues.enqueue(guild(), dropped);
    harness.ensure().await;
    let stale = harness.player.detach_completion().unwrap();

    // Act
    assert_ok!(harness.controller.stop_and_clear(guild(), harness.player()).await);
    assert_eq!(harness.state().await, PlaybackState::Idle);
    assert!(!harness.queues.has_pending(guild()));

    let fresh = track("fresh");
    let next = track("next");
    harness.queues.enqueue(guild(), fresh.clone());
    harness.queues.enqueue(guild(), next);
    harness.ensure().await;

    stale(StreamEnd::Finished);
    settle().await;

    // Assert
    assert_eq!(
        harness.player.played(),
        vec!["first".to_string(), "fresh".to_string()]
    );
    assert_eq!(harness.state().await, PlaybackState::Playing(fresh));
    assert_eq!(harness.queues.len(guild()), 1);
}

/// The synchronous completion fired by stop during stop_and_clear does not restart playback
#[rstest]
#[tokio::test]
async fn test_stop_and_clear_stays_idle(harness: Harness) {
    for t in tracks(3) {
        harness.queues.enqueue(guild(), t);
    }
    harness.ensure().await;

    assert_ok!(harness.controller.stop_and_clear(guild(), harness.player()).await);
    settle().await;

    assert_eq!(harness.player.stops(), 1);
    assert_eq!(harness.player.play_count(), 1);
    assert_eq!(harness.state().await, PlaybackState::Idle);
}

/// A stream that cannot be opened is skipped in favour of the next track
#[rstest]
#[tokio::test]
async fn test_play_failure_moves_to_next_track(harness: Harness) {
    let broken = track("broken");
    let good = track("good");
    harness.player.fail_on(stream_url("broken"));
    harness.queues.enqueue(guild(), broken);
    harness.queues.enqueue(guild(), good.clone());

    assert_eq!(harness.ensure().await, StartOutcome::Started(good.clone()));
    assert_eq!(
        harness.player.attempted(),
        vec!["broken".to_string(), "good".to_string()]
    );
    assert_eq!(harness.state().await, PlaybackState::Playing(good));
}

#[rstest]
#[tokio::test]
async fn test_only_failing_tracks_leave_guild_idle(harness: Harness) {
    harness.player.fail_on(stream_url("broken"));
    harness.queues.enqueue(guild(), track("broken"));

    assert_eq!(harness.ensure().await, StartOutcome::QueueEmpty);
    assert_eq!(harness.state().await, PlaybackState::Idle);
}

/// A stream that dies mid-way advances exactly like one that finished
#[rstest]
#[tokio::test]
async fn test_stream_error_advances_queue(harness: Harness) {
    let queued = tracks(2);
    for t in &queued {
        harness.queues.enqueue(guild(), t.clone());
    }
    harness.ensure().await;

    harness.player.fail("connection reset");
    settle().await;

    assert_eq!(harness.state().await, PlaybackState::Playing(queued[1].clone()));
}

/// A playing state whose stream went silent without a completion is recovered
#[rstest]
#[tokio::test]
async fn test_ensure_playing_recovers_lost_completion(harness: Harness) {
    let queued = tracks(2);
    for t in &queued {
        harness.queues.enqueue(guild(), t.clone());
    }
    harness.ensure().await;

    harness.player.go_silent();

    assert_eq!(harness.ensure().await, StartOutcome::Started(queued[1].clone()));
    assert_eq!(harness.player.overlapping_plays(), 0);
}

#[rstest]
#[tokio::test]
async fn test_ensure_playing_leaves_active_guild_alone(harness: Harness) {
    for t in tracks(2) {
        harness.queues.enqueue(guild(), t);
    }
    harness.ensure().await;
    assert_eq!(harness.ensure().await, StartOutcome::AlreadyActive);

    assert_ok!(harness.controller.pause(guild(), harness.player()).await);
    assert_eq!(harness.ensure().await, StartOutcome::AlreadyActive);

    assert_eq!(harness.player.play_count(), 1);
    assert_eq!(harness.queues.len(guild()), 1);
}

#[rstest]
#[tokio::test]
async fn test_ensure_playing_with_empty_queue_stays_idle(harness: Harness) {
    assert_eq!(harness.ensure().await, StartOutcome::QueueEmpty);
    assert_eq!(harness.state().await, PlaybackState::Idle);
    assert_eq!(harness.player.play_count(), 0);
}

/// Guilds have separate locks: a guild stuck in `play` does not block another guild
#[rstest]
#[tokio::test]
async fn test_busy_guild_does_not_block_other_guilds(harness: Harness) {
    use poise::serenity_prelude::GuildId;

    let other_guild = GuildId::new(2_000);
    let other_player = FakePlayer::new();
    harness.queues.enqueue(guild(), track("slow"));
    harness.queues.enqueue(other_guild, track("fast"));

    let gate = harness.player.hold_next_play();
    let controller = Arc::clone(&harness.controller);
    let slow_player = harness.player();
    let slow = tokio::spawn(async move { controller.ensure_playing(guild(), slow_player).await });
    settle().await;

    let fast = assert_ok!(
        harness
            .controller
            .ensure_playing(other_guild, other_player.clone())
            .await
    );
    assert_matches!(fast, StartOutcome::Started(t) if t.title == "fast");

    gate.notify_one();
    assert_matches!(slow.await, Ok(Ok(StartOutcome::Started(_))));
}

/// A second player for the same guild defers to the one that owns the current stream
#[rstest]
#[tokio::test]
async fn test_second_player_cannot_start_parallel_stream(harness: Harness) {
    // Arrange
    let one = track("one");
    harness.queues.enqueue(guild(), one.clone());
    harness.queues.enqueue(guild(), track("two"));
    harness.ensure().await;
    let other = FakePlayer::new();

    // Act
    let outcome = assert_ok!(
        harness
            .controller
            .ensure_playing(guild(), other.clone())
            .await
    );

    // Assert
    assert_eq!(outcome, StartOutcome::AlreadyActive);
    assert_eq!(other.play_count(), 0);
    assert_eq!(harness.player.mode(), Mode::Playing);
    assert_eq!(harness.state().await, PlaybackState::Playing(one));
    assert_eq!(harness.queues.len(guild()), 1);
}

/// Controls issued through another player reach the stream's owner
#[rstest]
#[tokio::test]
async fn test_controls_reach_the_owning_player(harness: Harness) {
    harness.queues.enqueue(guild(), track("one"));
    harness.ensure().await;
    let other = FakePlayer::new();

    assert_ok!(harness.controller.pause(guild(), other.clone()).await);
    assert_eq!(harness.player.mode(), Mode::Paused);
    assert_ok!(harness.controller.stop_and_clear(guild(), other.clone()).await);

    assert_eq!(harness.player.stops(), 1);
    assert_eq!(other.pauses(), 0);
    assert_eq!(other.stops(), 0);
    assert_eq!(harness.state().await, PlaybackState::Idle);
}

/// A silent stream on a replaced player is stopped before the new player takes over
#[rstest]
#[tokio::test]
async fn test_stall_recovery_on_new_player_stops_the_old_one(harness: Harness) {
    // Arrange
    let two = track("two");
    harness.queues.enqueue(guild(), track("one"));
    harness.queues.enqueue(guild(), two.clone());
    harness.ensure().await;
    harness.player.go_silent();
    let other = FakePlayer::new();

    // Act
    let outcome = assert_ok!(
        harness
            .controller
            .ensure_playing(guild(), other.clone())
            .await
    );
    settle().await;

    // Assert
    assert_eq!(outcome, StartOutcome::Started(two.clone()));
    assert_eq!(harness.player.stops(), 1);
    assert_eq!(other.played(), vec!["two"]);
    assert_eq!(harness.player.overlapping_plays() + other.overlapping_plays(), 0);
    assert_eq!(harness.state().await, PlaybackState::Playing(two));
}

/// Skips racing starts and completions still play every track once, in order, alone
#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_skip_racing_starts_and_completions_never_overlap(harness: Harness) {
    // Arrange
    let queued = tracks(12);
    for t in &queued {
        harness.queues.enqueue(guild(), t.clone());
    }
    let harness = Arc::new(harness);
    harness.ensure().await;

    // Act
    for _ in 0..12 {
        let controller = Arc::clone(&harness.controller);
        let player = harness.player();
        let starter = tokio::spawn(async move { controller.ensure_playing(guild(), player).await });

        let controller = Arc::clone(&harness.controller);
        let player = harness.player();
        let skipper = tokio::spawn(async move { controller.skip(guild(), player).await });

        let fake = harness.player.clone();
        let finisher = tokio::spawn(async move { fake.finish() });

        assert_ok!(assert_ok!(starter.await));
        assert_ok!(assert_ok!(skipper.await));
        assert_ok!(finisher.await);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    for _ in 0..40 {
        if harness.state().await.is_idle() && !harness.queues.has_pending(guild()) {
            break;
        }
        harness.player.finish();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    // Assert
    let titles: Vec<String> = queued.iter().map(|t| t.title.clone()).collect();
    assert_eq!(harness.player.overlapping_plays(), 0);
    assert_eq!(harness.player.played(), titles);
    assert_eq!(harness.player.attempted(), titles);
    assert_eq!(harness.state().await, PlaybackState::Idle);
}
