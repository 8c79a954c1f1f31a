//! The per-guild playback session.
//!
//! Each session runs as its own task and owns the guild's queue, voice
//! connection and playback state. Every input (commands, resolved streams,
//! track events from the voice driver) arrives through one command channel,
//! so at most one advance is ever in progress for a guild.

use serenity::model::id::{ChannelId, GuildId};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::commands::music::audio_sources::track_metadata::TrackMetadata;
use crate::utils::database::HistoryRecord;

use super::event_handlers::TrackEventSink;
use super::music_manager::{MusicError, MusicResult, MusicServices, SessionMap};
use super::voice::VoiceConnection;

/// Lifecycle of a guild session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing queued, nothing playing.
    #[default]
    Empty,
    /// A track was popped and its stream is being resolved.
    Starting,
    Playing,
    Paused,
    /// The queue ran dry; the session is torn down unless something is queued in time.
    Draining,
}

impl SessionState {
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }

    pub fn is_paused(self) -> bool {
        self == Self::Paused
    }
}

/// A resolved track together with where it was requested from.
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub track: TrackMetadata,
    pub voice_channel: ChannelId,
    pub text_channel: ChannelId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// 1-based position among upcoming tracks, 0 when the track starts right away.
    pub position: usize,
    pub starts_now: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PauseOutcome {
    Paused(TrackMetadata),
    Resumed(TrackMetadata),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    pub state: SessionState,
    pub now_playing: Option<TrackMetadata>,
    pub upcoming: Vec<TrackMetadata>,
}

impl QueueSnapshot {
    /// True when nothing is playing, starting or waiting.
    pub fn is_empty(&self) -> bool {
        self.now_playing.is_none()
            && self.upcoming.is_empty()
            && self.state != SessionState::Starting
    }
}

#[derive(Debug)]
pub(crate) enum SessionCommand {
    Enqueue {
        request: PlayRequest,
        reply: oneshot::Sender<MusicResult<EnqueueOutcome>>,
    },
    Pause {
        reply: oneshot::Sender<MusicResult<PauseOutcome>>,
    },
    Skip {
        reply: oneshot::Sender<MusicResult<TrackMetadata>>,
    },
    Stop {
        reply: oneshot::Sender<MusicResult<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<QueueSnapshot>,
    },
    /// Sent by the registry after it dropped the session's entry.
    Shutdown,
    Resolved {
        generation: u64,
        track: TrackMetadata,
        result: MusicResult<String>,
    },
    TrackEnded {
        generation: u64,
    },
    TrackFailed {
        generation: u64,
        reason: String,
    },
}

impl SessionCommand {
    /// Answers a request that arrived after the session stopped accepting work.
    fn reject(self) {
        match self {
            Self::Enqueue { reply, .. } => {
                let _ = reply.send(Err(MusicError::SessionClosed));
            }
            Self::Pause { reply } => {
                let _ = reply.send(Err(MusicError::SessionClosed));
            }
            Self::Skip { reply } => {
                let _ = reply.send(Err(MusicError::SessionClosed));
            }
            Self::Stop { reply } => {
                let _ = reply.send(Ok(()));
            }
            Self::Snapshot { reply } => {
                let _ = reply.send(QueueSnapshot::default());
            }
            Self::Shutdown
            | Self::Resolved { .. }
            | Self::TrackEnded { .. }
            | Self::TrackFailed { .. } => {}
        }
    }
}

/// Cheap, cloneable reference to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    id: u64,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Identity of the session; a guild gets a new id every time its session is recreated.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True once the session task has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub(crate) async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> MusicResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| MusicError::SessionClosed)?;
        response.await.map_err(|_| MusicError::SessionClosed)
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
    }
}

enum Flow {
    Continue,
    Exit,
}

pub(crate) struct Session {
    id: u64,
    guild_id: GuildId,
    services: MusicServices,
    registry: Weak<SessionMap>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    teardown_delay: Duration,

    queue: VecDeque<TrackMetadata>,
    voice_channel: Option<ChannelId>,
    text_channel: Option<ChannelId>,
    connection: Option<Box<dyn VoiceConnection>>,
    current: Option<TrackMetadata>,
    state: SessionState,
    // bumped whenever a track is popped and on release; stale results and events carry an older value
    generation: u64,
    teardown_at: Option<Instant>,
}

impl Session {
    pub(crate) fn spawn(
        id: u64,
        guild_id: GuildId,
        services: MusicServices,
        registry: Weak<SessionMap>,
        teardown_delay: Duration,
    ) -> SessionHandle {
        let (commands, receiver) = mpsc::unbounded_channel();
        let session = Session {
            id,
            guild_id,
            services,
            registry,
            commands: commands.clone(),
            teardown_delay,
            queue: VecDeque::new(),
            voice_channel: None,
            text_channel: None,
            connection: None,
            current: None,
            state: SessionState::Empty,
            generation: 0,
            teardown_at: None,
        };

        tokio::spawn(session.run(receiver));

        SessionHandle { id, commands }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        debug!("Session {} started for guild {}", self.id, self.guild_id);

        loop {
            let command = match self.teardown_at {
                Some(deadline) => tokio::select! {
                    command = commands.recv() => command,
                    () = sleep_until(deadline) => {
                        info!(
                            "Queue stayed empty for {:?}, tearing down session for guild {}",
                            self.teardown_delay, self.guild_id
                        );
                        self.release().await;
                        break;
                    }
                },
                None => commands.recv().await,
            };

            let Some(command) = command else {
                break;
            };

            if let Flow::Exit = self.handle(command).await {
                break;
            }
        }

        // anything still queued raced with shutdown; let callers retry elsewhere
        commands.close();
        while let Ok(command) = commands.try_recv() {
            command.reject();
        }

        debug!("Session {} finished for guild {}", self.id, self.guild_id);
    }

    async fn handle(&mut self, command: SessionCommand) -> Flow {
        match command {
            SessionCommand::Enqueue { request, reply } => {
                let outcome = self.enqueue(request);
                let _ = reply.send(Ok(outcome));
            }
            SessionCommand::Pause { reply } => {
                let _ = reply.send(self.toggle_pause());
            }
            SessionCommand::Skip { reply } => {
                let _ = reply.send(self.skip());
            }
            SessionCommand::Stop { reply } => {
                info!("Stopping playback for guild {}", self.guild_id);
                self.release().await;
                let _ = reply.send(Ok(()));
                return Flow::Exit;
            }
            SessionCommand::Shutdown => {
                self.release().await;
                return Flow::Exit;
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::Resolved {
                generation,
                track,
                result,
            } => self.on_resolved(generation, track, result).await,
            SessionCommand::TrackEnded { generation } => self.on_track_ended(generation),
            SessionCommand::TrackFailed { generation, reason } => {
                self.on_track_failed(generation, reason).await
            }
        }

        Flow::Continue
    }

    fn enqueue(&mut self, request: PlayRequest) -> EnqueueOutcome {
        let PlayRequest {
            track,
            voice_channel,
            text_channel,
        } = request;

        if self.voice_channel.is_some_and(|current| current != voice_channel) {
            info!(
                "Guild {} voice channel reassigned to {}",
                self.guild_id, voice_channel
            );
        }
        self.voice_channel = Some(voice_channel);
        self.text_channel = Some(text_channel);

        debug!("Queued '{}' for guild {}", track.title, self.guild_id);
        self.queue.push_back(track);

        if self.teardown_at.take().is_some() {
            info!("Teardown cancelled for guild {}", self.guild_id);
        }

        match self.state {
            SessionState::Empty | SessionState::Draining => {
                self.advance();
                EnqueueOutcome {
                    position: 0,
                    starts_now: true,
                }
            }
            _ => EnqueueOutcome {
                position: self.queue.len(),
                starts_now: false,
            },
        }
    }

    /// Starts the next queued track unless a start is already in flight.
    fn advance(&mut self) {
        if self.state == SessionState::Starting {
            debug!("Advance already in progress for guild {}", self.guild_id);
            return;
        }
        self.start_next();
    }

    fn start_next(&mut self) {
        self.current = None;

        let Some(track) = self.queue.pop_front() else {
            info!("No more tracks in queue for guild {}", self.guild_id);
            self.state = SessionState::Draining;
            self.teardown_at = Some(Instant::now() + self.teardown_delay);
            return;
        };

        self.generation += 1;
        self.state = SessionState::Starting;

        let generation = self.generation;
        let resolver = Arc::clone(&self.services.resolver);
        let commands = self.commands.clone();

        debug!("Resolving stream for '{}' in guild {}", track.title, self.guild_id);
        tokio::spawn(async move {
            let result = resolver.stream_url(&track.source_id).await;
            let _ = commands.send(SessionCommand::Resolved {
                generation,
                track,
                result,
            });
        });
    }

    async fn on_resolved(
        &mut self,
        generation: u64,
        track: TrackMetadata,
        result: MusicResult<String>,
    ) {
        if generation != self.generation || self.state != SessionState::Starting {
            debug!(
                "Discarding stale stream for '{}' in guild {}",
                track.title, self.guild_id
            );
            return;
        }

        match self.start_playback(generation, result).await {
            Ok(()) => {
                info!("Now playing '{}' in guild {}", track.title, self.guild_id);
                self.state = SessionState::Playing;
                self.notify_now_playing(&track).await;
                self.persist(&track);
                self.current = Some(track);
            }
            Err(err) => {
                warn!(
                    "Failed to start '{}' in guild {}: {}",
                    track.title, self.guild_id, err
                );
                self.notify_error(&track, &err).await;
                self.start_next();
            }
        }
    }

    async fn start_playback(
        &mut self,
        generation: u64,
        stream: MusicResult<String>,
    ) -> MusicResult<()> {
        let stream_url = stream?;

        if self.connection.is_none() {
            let channel_id = self.voice_channel.ok_or(MusicError::NotConnected)?;
            let connection = self
                .services
                .transport
                .connect(self.guild_id, channel_id)
                .await?;
            self.connection = Some(connection);
        }

        let events = TrackEventSink::new(generation, self.commands.clone());
        let connection = self.connection.as_mut().ok_or(MusicError::NotConnected)?;
        connection.play(&stream_url, events).await
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.state.is_playing()
    }

    fn on_track_ended(&mut self, generation: u64) {
        if !self.is_current(generation) {
            debug!("Ignoring stale track end for guild {}", self.guild_id);
            return;
        }
        debug!("Track ended for guild {}", self.guild_id);
        self.advance();
    }

    async fn on_track_failed(&mut self, generation: u64, reason: String) {
        if !self.is_current(generation) {
            debug!("Ignoring stale track error for guild {}", self.guild_id);
            return;
        }
        error!("Audio player error in guild {}: {}", self.guild_id, reason);
        if let Some(track) = self.current.clone() {
            self.notify_error(&track, &MusicError::PlaybackError(reason))
                .await;
        }
        self.advance();
    }

    fn toggle_pause(&mut self) -> MusicResult<PauseOutcome> {
        let track = match (&self.current, self.state.is_playing()) {
            (Some(track), true) => track.clone(),
            _ => return Err(MusicError::NothingPlaying),
        };
        let connection = self.connection.as_ref().ok_or(MusicError::NotConnected)?;

        if self.state.is_paused() {
            connection.resume()?;
            self.state = SessionState::Playing;
            info!("Resumed '{}' in guild {}", track.title, self.guild_id);
            Ok(PauseOutcome::Resumed(track))
        } else {
            connection.pause()?;
            self.state = SessionState::Paused;
            info!("Paused '{}' in guild {}", track.title, self.guild_id);
            Ok(PauseOutcome::Paused(track))
        }
    }

    /// Stops the current track; its end event advances the queue.
    fn skip(&mut self) -> MusicResult<TrackMetadata> {
        let track = match (&self.current, self.state.is_playing()) {
            (Some(track), true) => track.clone(),
            _ => return Err(MusicError::NothingPlaying),
        };
        self.connection
            .as_ref()
            .ok_or(MusicError::NotConnected)?
            .stop()?;
        info!("Skipped '{}' in guild {}", track.title, self.guild_id);
        Ok(track)
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            state: self.state,
            now_playing: self.current.clone(),
            upcoming: self.queue.iter().cloned().collect(),
        }
    }

    /// Drops all tracks, leaves the voice channel and unregisters this session.
    async fn release(&mut self) {
        self.generation += 1;
        self.queue.clear();
        self.current = None;
        self.teardown_at = None;
        self.state = SessionState::Empty;

        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.stop() {
                debug!("Nothing to stop in guild {}: {}", self.guild_id, e);
            }
            connection.disconnect().await;
        }

        if let Some(registry) = self.registry.upgrade() {
            let id = self.id;
            registry.remove_if(&self.guild_id, |_, handle| handle.id() == id);
        }
    }

    async fn notify_now_playing(&self, track: &TrackMetadata) {
        let Some(channel_id) = self.text_channel else {
            return;
        };
        if let Err(e) = self.services.notifier.now_playing(channel_id, track).await {
            warn!(
                "Failed to send now playing message for guild {}: {}",
                self.guild_id, e
            );
        }
    }

    async fn notify_error(&self, track: &TrackMetadata, err: &MusicError) {
        let Some(channel_id) = self.text_channel else {
            return;
        };
        if let Err(e) = self
            .services
            .notifier
            .playback_error(channel_id, track, err)
            .await
        {
            warn!(
                "Failed to report playback error for guild {}: {}",
                self.guild_id, e
            );
        }
    }

    /// Saves the play in the background; failures are only logged.
    fn persist(&self, track: &TrackMetadata) {
        let Some(history) = self.services.history.clone() else {
            return;
        };
        let record = HistoryRecord::played_now(self.guild_id, track);
        tokio::spawn(async move {
            if let Err(e) = history.record(record).await {
                error!("Error saving to history: {}", e);
            }
        });
    }
}
