use dashmap::DashMap;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::MediaResolver;
use crate::commands::music::audio_sources::track_metadata::TrackMetadata;
use crate::utils::database::HistoryStore;

use super::notifier::StatusNotifier;
use super::session::{
    EnqueueOutcome, PauseOutcome, PlayRequest, QueueSnapshot, Session, SessionCommand,
    SessionHandle,
};
use super::voice::VoiceTransport;

/// Grace period between the queue draining and the session being torn down.
pub const TEARDOWN_DELAY: Duration = Duration::from_secs(5);

/// Errors that can occur during music operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("No active music playback")]
    NoSession,

    #[error("Nothing is playing right now")]
    NothingPlaying,

    #[error("No results found: {0}")]
    NotFound(String),

    #[error("No suitable audio format found for {0}")]
    NoPlayableFormat(String),

    #[error("Audio source error: {0}")]
    AudioSourceError(String),

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Playback error: {0}")]
    PlaybackError(String),

    #[error("Music session closed")]
    SessionClosed,
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// The collaborators every session talks to.
#[derive(Clone)]
pub struct MusicServices {
    pub resolver: Arc<dyn MediaResolver>,
    pub transport: Arc<dyn VoiceTransport>,
    pub notifier: Arc<dyn StatusNotifier>,
    pub history: Option<Arc<dyn HistoryStore>>,
}

pub(crate) type SessionMap = DashMap<GuildId, SessionHandle>;

/// Registry of per-guild sessions. At most one live session exists per guild.
///
/// Cloning is cheap and every clone refers to the same registry.
#[derive(Clone)]
pub struct MusicManager {
    sessions: Arc<SessionMap>,
    services: MusicServices,
    next_session_id: Arc<AtomicU64>,
    teardown_delay: Duration,
}

impl MusicManager {
    pub fn new(services: MusicServices) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            services,
            next_session_id: Arc::new(AtomicU64::new(1)),
            teardown_delay: TEARDOWN_DELAY,
        }
    }

    /// Overrides the idle teardown delay.
    pub fn with_teardown_delay(mut self, delay: Duration) -> Self {
        self.teardown_delay = delay;
        self
    }

    pub fn services(&self) -> &MusicServices {
        &self.services
    }

    /// Returns the guild's session, spawning an empty one if there is none.
    pub fn get_or_create(&self, guild_id: GuildId) -> SessionHandle {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
                info!("Creating music session {} for guild {}", id, guild_id);
                Session::spawn(
                    id,
                    guild_id,
                    self.services.clone(),
                    Arc::downgrade(&self.sessions),
                    self.teardown_delay,
                )
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<SessionHandle> {
        self.sessions.get(&guild_id).map(|entry| entry.clone())
    }

    pub fn is_active(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drops the guild's session, releasing its voice connection. Idempotent.
    pub fn remove(&self, guild_id: GuildId) {
        if let Some((_, handle)) = self.sessions.remove(&guild_id) {
            info!("Removing music session {} for guild {}", handle.id(), guild_id);
            handle.shutdown();
        }
    }

    /// Get the voice channel ID that the user is currently in
    pub fn get_user_voice_channel(
        ctx: &Context,
        guild_id: GuildId,
        user_id: UserId,
    ) -> MusicResult<ChannelId> {
        // Get the guild
        let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

        // Get the voice state of the user
        let voice_state = guild
            .voice_states
            .get(&user_id)
            .ok_or(MusicError::UserNotInVoiceChannel)?;

        voice_state
            .channel_id
            .ok_or(MusicError::UserNotInVoiceChannel)
    }

    /// Resolves `query` and queues the result, starting playback if the guild is idle.
    pub async fn process_play_request(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        requested_by: &str,
        query: &str,
    ) -> MusicResult<(TrackMetadata, EnqueueOutcome)> {
        let track = self.services.resolver.resolve(query, requested_by).await?;
        let outcome = self
            .enqueue(
                guild_id,
                PlayRequest {
                    track: track.clone(),
                    voice_channel,
                    text_channel,
                },
            )
            .await?;
        Ok((track, outcome))
    }

    /// Appends an already resolved track to the guild's queue.
    ///
    /// A session that closes while the request is in flight rejects it; the
    /// request is then retried once against a fresh session.
    pub async fn enqueue(
        &self,
        guild_id: GuildId,
        request: PlayRequest,
    ) -> MusicResult<EnqueueOutcome> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let handle = self.get_or_create(guild_id);
            let request = request.clone();
            // a closing session answers leftover requests with SessionClosed
            match handle
                .request(|reply| SessionCommand::Enqueue { request, reply })
                .await
                .and_then(|outcome| outcome)
            {
                Err(MusicError::SessionClosed) if attempts < 2 => {
                    debug!(
                        "Session {} for guild {} closed during enqueue, retrying",
                        handle.id(),
                        guild_id
                    );
                    self.evict(guild_id, handle.id());
                }
                Err(MusicError::SessionClosed) => {
                    warn!("Giving up enqueue for guild {} after retry", guild_id);
                    return Err(MusicError::SessionClosed);
                }
                result => return result,
            }
        }
    }

    /// Removes the entry only if it still belongs to `session_id`.
    fn evict(&self, guild_id: GuildId, session_id: u64) {
        self.sessions
            .remove_if(&guild_id, |_, handle| handle.id() == session_id);
    }

    /// Toggles pause on the guild's current track.
    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<PauseOutcome> {
        let handle = self.get(guild_id).ok_or(MusicError::NoSession)?;
        handle
            .request(|reply| SessionCommand::Pause { reply })
            .await?
    }

    /// Stops the current track; the next queued track starts on its own.
    pub async fn skip(&self, guild_id: GuildId) -> MusicResult<TrackMetadata> {
        let handle = self.get(guild_id).ok_or(MusicError::NoSession)?;
        handle.request(|reply| SessionCommand::Skip { reply }).await?
    }

    /// Clears the queue, leaves the voice channel and removes the session immediately.
    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        let handle = self.get(guild_id).ok_or(MusicError::NoSession)?;
        match handle.request(|reply| SessionCommand::Stop { reply }).await {
            // the session was already shutting down on its own
            Err(MusicError::SessionClosed) => Ok(()),
            other => other?,
        }
    }

    /// Current and upcoming tracks. An absent session yields an empty snapshot.
    pub async fn snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        let Some(handle) = self.get(guild_id) else {
            return QueueSnapshot::default();
        };
        handle
            .request(|reply| SessionCommand::Snapshot { reply })
            .await
            .unwrap_or_default()
    }
}
