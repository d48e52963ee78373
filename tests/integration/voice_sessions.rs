use assert_matches::assert_matches;
use jukebox::commands::music::utils::music_manager::MusicError;
use jukebox::commands::music::utils::playback::Player;
use jukebox::commands::music::utils::voice_sessions::VoiceSessions;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::common::fixtures::guild;
use crate::common::mocks::FakePlayer;
use crate::test_utils;

/// Simultaneous joins for one guild connect once and share the resulting player
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_connects_share_one_player() {
    // Arrange
    test_utils::init();
    let sessions = Arc::new(VoiceSessions::new());
    let connects = Arc::new(AtomicUsize::new(0));

    // Act
    let joins: Vec<_> = (0..8)
        .map(|_| {
            let sessions = Arc::clone(&sessions);
            let connects = Arc::clone(&connects);
            tokio::spawn(async move {
                sessions
                    .get_or_connect(guild(), move || async move {
                        connects.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok::<_, MusicError>(FakePlayer::new() as Arc<dyn Player>)
                    })
                    .await
            })
        })
        .collect();

    let mut players = Vec::new();
    for join in joins {
        players.push(join.await.unwrap().unwrap());
    }

    // Assert
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert!(players.iter().all(|p| Arc::ptr_eq(p, &players[0])));
    assert_eq!(sessions.len(), 1);
    assert!(sessions.is_current(guild(), &players[0]));
}

/// A failed join leaves no session behind and the next attempt connects again
#[tokio::test]
async fn test_failed_connect_registers_nothing() {
    test_utils::init();
    let sessions = VoiceSessions::new();

    let failed = sessions
        .get_or_connect(guild(), || async {
            Err::<Arc<dyn Player>, _>(MusicError::JoinError("missing permissions".to_string()))
        })
        .await;
    assert_matches!(failed, Err(MusicError::JoinError(_)));
    assert!(!sessions.contains(guild()));

    let player = sessions
        .get_or_connect(guild(), || async {
            Ok::<_, MusicError>(FakePlayer::new() as Arc<dyn Player>)
        })
        .await
        .unwrap();
    assert!(sessions.is_current(guild(), &player));
}

#[tokio::test]
async fn test_replaced_player_is_no_longer_current() {
    test_utils::init();
    let sessions = VoiceSessions::new();
    let old: Arc<dyn Player> = FakePlayer::new();
    sessions.insert(guild(), Arc::clone(&old));

    let new: Arc<dyn Player> = FakePlayer::new();
    sessions.remove(guild());
    sessions.insert(guild(), Arc::clone(&new));

    assert!(!sessions.is_current(guild(), &old));
    assert!(sessions.is_current(guild(), &new));
}
