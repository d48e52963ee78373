//! Test data shared by the integration tests

use fake::Fake;
use fake::faker::lorem::en::Words;
use jukebox::commands::music::audio_sources::TrackMetadata;
use poise::serenity_prelude::GuildId;
use std::time::Duration;

pub fn guild() -> GuildId {
    GuildId::new(1_000)
}

/// A playable track whose stream URL is derived from its title.
pub fn track(title: &str) -> TrackMetadata {
    TrackMetadata::new(title, stream_url(title))
        .unwrap()
        .with_artist("Test Artist")
        .with_duration(Duration::from_secs(180))
}

pub fn stream_url(title: &str) -> String {
    format!("https://cdn.example/{}.opus", title.replace(' ', "-"))
}

/// `n` tracks with generated, distinct titles.
pub fn tracks(n: usize) -> Vec<TrackMetadata> {
    (0..n)
        .map(|i| track(&format!("{} {}", i, Words(1..3).fake::<Vec<String>>().join(" "))))
        .collect()
}
