//! Defines the `TrackMetadata` struct, the unit that moves through a guild's queue,
//! and its conversion from `yt-dlp --dump-json` output.

use serde::Deserialize;
use std::time::Duration;

use super::youtube::watch_url;
use crate::commands::music::utils::music_manager::MusicError;

/// Metadata of one queued song. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    /// The title of the track.
    pub title: String,
    /// The YouTube video id.
    pub source_id: String,
    /// The duration of the track, if known.
    pub duration: Option<Duration>,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail: Option<String>,
    /// Uploader or channel name.
    pub artist: Option<String>,
    /// The tag of the user who requested the track.
    pub requested_by: String,
}

impl TrackMetadata {
    /// Canonical watch page URL for this track.
    pub fn url(&self) -> String {
        watch_url(&self.source_id)
    }

    /// Parses the first JSON document printed by `yt-dlp -j`.
    ///
    /// Search queries print nothing when there are no results, which maps to
    /// [`MusicError::NotFound`].
    pub fn from_ytdlp_json(stdout: &[u8], requested_by: &str) -> Result<Self, MusicError> {
        let video = YtDlpVideo::parse_first(stdout)?;
        video.into_metadata(requested_by)
    }
}

/// The subset of `yt-dlp` JSON output we rely on.
#[derive(Debug, Deserialize)]
pub(crate) struct YtDlpVideo {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    acodec: Option<String>,
    vcodec: Option<String>,
}

impl YtDlpFormat {
    fn is_audio_only(&self) -> bool {
        let has_audio = self.acodec.as_deref().is_some_and(|codec| codec != "none");
        let has_video = self.vcodec.as_deref().is_some_and(|codec| codec != "none");
        has_audio && !has_video
    }
}

impl YtDlpVideo {
    pub(crate) fn parse_first(stdout: &[u8]) -> Result<Self, MusicError> {
        let text = String::from_utf8_lossy(stdout);
        let line = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| MusicError::NotFound("No results found".to_string()))?;

        serde_json::from_str(line).map_err(|e| {
            MusicError::AudioSourceError(format!("Failed to parse video metadata: {}", e))
        })
    }

    /// Whether at least one audio-only encoding is listed.
    pub(crate) fn has_audio_only_format(&self) -> bool {
        self.formats.iter().any(YtDlpFormat::is_audio_only)
    }

    pub(crate) fn into_metadata(self, requested_by: &str) -> Result<TrackMetadata, MusicError> {
        let source_id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| MusicError::NotFound("Could not find a valid video".to_string()))?;

        Ok(TrackMetadata {
            title: self.title.unwrap_or_else(|| "Unknown Title".to_string()),
            source_id,
            duration: self
                .duration
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64),
            thumbnail: self.thumbnail,
            artist: self.uploader.or(self.channel),
            requested_by: requested_by.to_string(),
        })
    }
}
