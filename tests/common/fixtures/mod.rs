//! Test fixtures for the music bot
//! Sample ids and tracks shared by the integration tests

use serenity::model::id::{ChannelId, GuildId};
use std::time::Duration;
use wahuhuu::commands::music::audio_sources::track_metadata::TrackMetadata;

pub const GUILD: GuildId = GuildId::new(100);
pub const OTHER_GUILD: GuildId = GuildId::new(200);
pub const VOICE_CHANNEL: ChannelId = ChannelId::new(300);
pub const OTHER_VOICE_CHANNEL: ChannelId = ChannelId::new(301);
pub const TEXT_CHANNEL: ChannelId = ChannelId::new(400);

pub const REQUESTER: &str = "listener#0001";

/// Queries starting with this never resolve.
pub const UNKNOWN_QUERY_PREFIX: &str = "missing";

/// Builds a track whose source id is derived from `title`.
pub fn track(title: &str) -> TrackMetadata {
    TrackMetadata {
        title: title.to_string(),
        source_id: source_id(title),
        duration: Some(Duration::from_secs(180)),
        thumbnail: None,
        artist: Some("Test Artist".to_string()),
        requested_by: REQUESTER.to_string(),
    }
}

pub fn source_id(title: &str) -> String {
    format!("id-{}", title.replace(' ', "-"))
}

pub fn stream_url(source_id: &str) -> String {
    format!("https://stream.test/{}", source_id)
}

/// `count` distinct titles: "Song 1", "Song 2", ...
pub fn titles(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("Song {}", n)).collect()
}
