//! This module defines the interface for turning user queries into playable tracks.
//! YouTube (via `yt-dlp`) is the only implementation.

/// Submodule defining the `TrackMetadata` struct used across the music commands.
pub mod track_metadata;
/// Submodule implementing the `MediaResolver` trait for YouTube.
pub mod youtube;

use crate::commands::music::utils::music_manager::MusicError;
use serenity::async_trait;
use track_metadata::TrackMetadata;

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, MusicError>;

/// Translates user queries into track metadata and tracks into streamable URLs.
/// Requires `Send + Sync` to be shared by every guild session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resolves free text or a recognised video URL to a single track.
    ///
    /// Fails with [`MusicError::NotFound`] when nothing matches.
    async fn resolve(&self, query: &str, requested_by: &str) -> AudioSourceResult<TrackMetadata>;

    /// Picks an audio-only encoding of `source_id` and returns its direct URL.
    ///
    /// Fails with [`MusicError::NoPlayableFormat`] when no such encoding exists.
    async fn stream_url(&self, source_id: &str) -> AudioSourceResult<String>;
}
