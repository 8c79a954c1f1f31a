//! Implements the `MediaResolver` trait for YouTube.
//! Uses the `yt-dlp` command-line tool both for metadata lookups and for
//! deciphering a direct audio stream URL.

use regex::Regex;
use serenity::async_trait;
use std::process::Output;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::track_metadata::{TrackMetadata, YtDlpVideo};
use super::{AudioSourceResult, MediaResolver};
use crate::commands::music::utils::music_manager::MusicError;

/// Matches canonical single-video URLs and captures the 11 character video id.
static YOUTUBE_VIDEO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?(?:youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})$")
        .unwrap()
});

/// Format selector for the stream: prefer opus, accept any audio-only encoding.
const AUDIO_FORMAT: &str = "bestaudio[acodec=opus]/bestaudio";

/// Canonical watch page URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// How a user query is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YoutubeQuery {
    /// Direct lookup of a known video id.
    Video(String),
    /// Free-text search, first result wins.
    Search(String),
}

impl YoutubeQuery {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match YOUTUBE_VIDEO_REGEX.captures(input).and_then(|c| c.get(1)) {
            Some(id) => Self::Video(id.as_str().to_string()),
            None => Self::Search(input.to_string()),
        }
    }

    /// The positional argument handed to `yt-dlp`.
    pub fn ytdlp_target(&self) -> String {
        match self {
            Self::Video(id) => watch_url(id),
            Self::Search(text) => format!("ytsearch1:{}", text),
        }
    }
}

/// Returns the first non-empty line of `yt-dlp -g` output.
pub fn first_stream_url(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("http"))
        .map(str::to_string)
}

/// The main struct implementing YouTube lookups (via `yt-dlp`).
pub struct YoutubeApi {
    ytdlp: String,
}

impl Default for YoutubeApi {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YoutubeApi {
    pub fn new(ytdlp_path: impl Into<String>) -> Self {
        Self {
            ytdlp: ytdlp_path.into(),
        }
    }

    async fn run_ytdlp(&self, args: &[&str]) -> AudioSourceResult<Output> {
        debug!("Running {} {:?}", self.ytdlp, args);
        Command::new(&self.ytdlp)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MusicError::AudioSourceError(format!("Failed to run yt-dlp: {}", e)))
    }

    /// Fetches metadata for a parsed query.
    async fn lookup(
        &self,
        query: &YoutubeQuery,
        requested_by: &str,
    ) -> AudioSourceResult<TrackMetadata> {
        let target = query.ytdlp_target();
        let output = self
            .run_ytdlp(&["-j", "--no-playlist", "--no-warnings", &target])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp lookup for {} failed: {}", target, stderr.trim());
            return Err(MusicError::NotFound(format!(
                "No results found for {}",
                target
            )));
        }

        let video = YtDlpVideo::parse_first(&output.stdout)?;
        if let YoutubeQuery::Video(id) = query {
            if !video.has_audio_only_format() {
                return Err(MusicError::NoPlayableFormat(id.clone()));
            }
        }

        video.into_metadata(requested_by)
    }
}

#[async_trait]
impl MediaResolver for YoutubeApi {
    async fn resolve(&self, query: &str, requested_by: &str) -> AudioSourceResult<TrackMetadata> {
        let query = YoutubeQuery::parse(query);
        info!("Resolving {:?}", query);
        let metadata = self.lookup(&query, requested_by).await?;
        info!("Resolved '{}' ({})", metadata.title, metadata.source_id);
        Ok(metadata)
    }

    async fn stream_url(&self, source_id: &str) -> AudioSourceResult<String> {
        let url = watch_url(source_id);
        let output = self
            .run_ytdlp(&["-f", AUDIO_FORMAT, "-g", "--no-playlist", "--no-warnings", &url])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("No audio stream for {}: {}", source_id, stderr.trim());
            return Err(MusicError::NoPlayableFormat(source_id.to_string()));
        }

        first_stream_url(&output.stdout).ok_or_else(|| MusicError::NoPlayableFormat(source_id.to_string()))
    }
}
