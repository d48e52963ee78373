//! Integration tests driving the playback engine through its public API

pub mod playback;
pub mod voice_sessions;
