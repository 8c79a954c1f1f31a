//! In-memory stand-ins for the collaborators a music session talks to.
//! Each records what it was asked to do so tests can assert on it.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wahuhuu::Error;
use wahuhuu::commands::music::audio_sources::track_metadata::TrackMetadata;
use wahuhuu::commands::music::audio_sources::{AudioSourceResult, MediaResolver};
use wahuhuu::commands::music::utils::event_handlers::TrackEventSink;
use wahuhuu::commands::music::utils::music_manager::{MusicError, MusicResult};
use wahuhuu::commands::music::utils::notifier::StatusNotifier;
use wahuhuu::commands::music::utils::voice::{VoiceConnection, VoiceTransport};
use wahuhuu::utils::database::{HistoryError, HistoryRecord, HistoryStore};

use super::fixtures;

/// Resolves any query to a fixture track; stream lookups can be delayed or failed per source id.
#[derive(Default)]
pub struct FakeResolver {
    delays: Mutex<HashMap<String, Duration>>,
    unplayable: Mutex<HashSet<String>>,
    stream_calls: Mutex<Vec<String>>,
}

impl FakeResolver {
    pub fn delay_stream(&self, title: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(fixtures::source_id(title), delay);
    }

    pub fn fail_stream(&self, title: &str) {
        self.unplayable
            .lock()
            .unwrap()
            .insert(fixtures::source_id(title));
    }

    /// Source ids passed to `stream_url`, in call order.
    pub fn stream_calls(&self) -> Vec<String> {
        self.stream_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaResolver for FakeResolver {
    async fn resolve(&self, query: &str, requested_by: &str) -> AudioSourceResult<TrackMetadata> {
        if query.starts_with(fixtures::UNKNOWN_QUERY_PREFIX) {
            return Err(MusicError::NotFound(format!("No results found for {}", query)));
        }
        let mut track = fixtures::track(query);
        track.requested_by = requested_by.to_string();
        Ok(track)
    }

    async fn stream_url(&self, source_id: &str) -> AudioSourceResult<String> {
        self.stream_calls
            .lock()
            .unwrap()
            .push(source_id.to_string());

        let delay = self.delays.lock().unwrap().get(source_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.unplayable.lock().unwrap().contains(source_id) {
            return Err(MusicError::NoPlayableFormat(source_id.to_string()));
        }
        Ok(fixtures::stream_url(source_id))
    }
}

#[derive(Default)]
struct VoiceState {
    connects: Vec<(GuildId, ChannelId)>,
    plays: Vec<(GuildId, String)>,
    playing: HashMap<GuildId, TrackEventSink>,
    paused: HashSet<GuildId>,
    disconnects: Vec<GuildId>,
}

/// Voice transport whose connections only record calls.
///
/// Like songbird, stopping or replacing a track fires its end event.
#[derive(Default, Clone)]
pub struct FakeTransport {
    state: Arc<Mutex<VoiceState>>,
    refuse_connect: Arc<Mutex<bool>>,
}

impl FakeTransport {
    pub fn refuse_connections(&self, refuse: bool) {
        *self.refuse_connect.lock().unwrap() = refuse;
    }

    /// Plays the current track of `guild_id` to its end.
    pub fn finish_current(&self, guild_id: GuildId) -> bool {
        let sink = self.state.lock().unwrap().playing.remove(&guild_id);
        sink.map(|sink| sink.finished()).is_some()
    }

    /// Makes the player fail the current track of `guild_id`.
    pub fn fail_current(&self, guild_id: GuildId, reason: &str) -> bool {
        let sink = self.state.lock().unwrap().playing.remove(&guild_id);
        sink.map(|sink| sink.errored(reason)).is_some()
    }

    /// The event sink of the track currently playing in `guild_id`.
    pub fn current_sink(&self, guild_id: GuildId) -> Option<TrackEventSink> {
        self.state.lock().unwrap().playing.get(&guild_id).cloned()
    }

    pub fn is_playing(&self, guild_id: GuildId) -> bool {
        self.state.lock().unwrap().playing.contains_key(&guild_id)
    }

    pub fn is_paused(&self, guild_id: GuildId) -> bool {
        self.state.lock().unwrap().paused.contains(&guild_id)
    }

    /// Stream URLs started in `guild_id`, in order.
    pub fn plays(&self, guild_id: GuildId) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .plays
            .iter()
            .filter(|(guild, _)| *guild == guild_id)
            .map(|(_, url)| url.clone())
            .collect()
    }

    pub fn connects(&self, guild_id: GuildId) -> Vec<ChannelId> {
        self.state
            .lock()
            .unwrap()
            .connects
            .iter()
            .filter(|(guild, _)| *guild == guild_id)
            .map(|(_, channel)| *channel)
            .collect()
    }

    pub fn disconnects(&self, guild_id: GuildId) -> usize {
        self.state
            .lock()
            .unwrap()
            .disconnects
            .iter()
            .filter(|guild| **guild == guild_id)
            .count()
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MusicResult<Box<dyn VoiceConnection>> {
        if *self.refuse_connect.lock().unwrap() {
            return Err(MusicError::JoinError("connection refused".to_string()));
        }
        self.state
            .lock()
            .unwrap()
            .connects
            .push((guild_id, channel_id));
        Ok(Box::new(FakeConnection {
            guild_id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeConnection {
    guild_id: GuildId,
    state: Arc<Mutex<VoiceState>>,
}

impl FakeConnection {
    fn take_current(&self) -> Option<TrackEventSink> {
        let mut state = self.state.lock().unwrap();
        state.paused.remove(&self.guild_id);
        state.playing.remove(&self.guild_id)
    }
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    async fn play(&mut self, stream_url: &str, events: TrackEventSink) -> MusicResult<()> {
        let replaced = {
            let mut state = self.state.lock().unwrap();
            state.plays.push((self.guild_id, stream_url.to_string()));
            state.paused.remove(&self.guild_id);
            state.playing.insert(self.guild_id, events)
        };
        if let Some(previous) = replaced {
            previous.finished();
        }
        Ok(())
    }

    fn pause(&self) -> MusicResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.playing.contains_key(&self.guild_id) {
            return Err(MusicError::NothingPlaying);
        }
        state.paused.insert(self.guild_id);
        Ok(())
    }

    fn resume(&self) -> MusicResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.playing.contains_key(&self.guild_id) {
            return Err(MusicError::NothingPlaying);
        }
        state.paused.remove(&self.guild_id);
        Ok(())
    }

    fn stop(&self) -> MusicResult<()> {
        let sink = self.take_current().ok_or(MusicError::NothingPlaying)?;
        sink.finished();
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(sink) = self.take_current() {
            sink.finished();
        }
        self.state.lock().unwrap().disconnects.push(self.guild_id);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    NowPlaying {
        channel_id: ChannelId,
        title: String,
    },
    Failed {
        channel_id: ChannelId,
        title: String,
        error: MusicError,
    },
}

/// Collects status messages instead of posting them.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    broken: Mutex<bool>,
}

impl RecordingNotifier {
    /// Every later notification fails after being recorded.
    pub fn break_channel(&self) {
        *self.broken.lock().unwrap() = true;
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn now_playing_titles(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::NowPlaying { title, .. } => Some(title),
                Notice::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(String, MusicError)> {
        self.notices()
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::Failed { title, error, .. } => Some((title, error)),
                Notice::NowPlaying { .. } => None,
            })
            .collect()
    }

    fn push(&self, notice: Notice) -> Result<(), Error> {
        self.notices.lock().unwrap().push(notice);
        if *self.broken.lock().unwrap() {
            return Err("text channel unavailable".into());
        }
        Ok(())
    }
}

#[async_trait]
impl StatusNotifier for RecordingNotifier {
    async fn now_playing(&self, channel_id: ChannelId, track: &TrackMetadata) -> Result<(), Error> {
        self.push(Notice::NowPlaying {
            channel_id,
            title: track.title.clone(),
        })
    }

    async fn playback_error(
        &self,
        channel_id: ChannelId,
        track: &TrackMetadata,
        error: &MusicError,
    ) -> Result<(), Error> {
        self.push(Notice::Failed {
            channel_id,
            title: track.title.clone(),
            error: error.clone(),
        })
    }
}

/// History store kept in a vector; can be switched to failing writes.
#[derive(Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<HistoryRecord>>,
    failing: Mutex<bool>,
}

impl MemoryHistory {
    pub fn fail_writes(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn titles(&self, guild_id: GuildId) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.guild_id == guild_id)
            .map(|record| record.title.clone())
            .collect()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn record(&self, entry: HistoryRecord) -> Result<(), HistoryError> {
        if *self.failing.lock().unwrap() {
            return Err(HistoryError::Poisoned);
        }
        self.records.lock().unwrap().push(entry);
        Ok(())
    }

    async fn recent(
        &self,
        guild_id: GuildId,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, HistoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|record| record.guild_id == guild_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
