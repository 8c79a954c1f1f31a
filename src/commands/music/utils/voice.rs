//! Voice channel access behind the two traits the session drives.
//!
//! `SongbirdTransport` is the production implementation: joining a channel
//! yields a songbird `Call`, which doubles as the audio player for every
//! track the session plays.

use reqwest::Client as HttpClient;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Mutex as SerenityMutex;
use songbird::input::HttpRequest;
use songbird::tracks::TrackHandle;
use songbird::{Call, Event, Songbird, TrackEvent};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::event_handlers::{TrackEndNotifier, TrackErrorNotifier, TrackEventSink};
use super::music_manager::{MusicError, MusicResult};

/// Opens voice connections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MusicResult<Box<dyn VoiceConnection>>;
}

/// An open voice connection and its player. Plays one track at a time.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Replaces whatever is playing with `stream_url`.
    ///
    /// The track reports its end or failure through `events`.
    async fn play(&mut self, stream_url: &str, events: TrackEventSink) -> MusicResult<()>;

    fn pause(&self) -> MusicResult<()>;

    fn resume(&self) -> MusicResult<()>;

    /// Stops the current track. Its end event still fires.
    fn stop(&self) -> MusicResult<()>;

    async fn disconnect(&mut self);
}

pub struct SongbirdTransport {
    songbird: Arc<Songbird>,
    http_client: HttpClient,
}

impl SongbirdTransport {
    pub fn new(songbird: Arc<Songbird>, http_client: HttpClient) -> Self {
        Self {
            songbird,
            http_client,
        }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MusicResult<Box<dyn VoiceConnection>> {
        let call = self
            .songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| {
                error!("Failed to join voice channel {}: {}", channel_id, e);
                MusicError::JoinError(e.to_string())
            })?;

        info!("Joined voice channel {} in guild {}", channel_id, guild_id);

        Ok(Box::new(SongbirdConnection {
            songbird: Arc::clone(&self.songbird),
            guild_id,
            call,
            http_client: self.http_client.clone(),
            track: None,
        }))
    }
}

pub struct SongbirdConnection {
    songbird: Arc<Songbird>,
    guild_id: GuildId,
    call: Arc<SerenityMutex<Call>>,
    http_client: HttpClient,
    track: Option<TrackHandle>,
}

impl SongbirdConnection {
    fn current(&self) -> MusicResult<&TrackHandle> {
        self.track.as_ref().ok_or(MusicError::NothingPlaying)
    }
}

fn control_error(err: songbird::tracks::ControlError) -> MusicError {
    MusicError::PlaybackError(err.to_string())
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn play(&mut self, stream_url: &str, events: TrackEventSink) -> MusicResult<()> {
        let input = HttpRequest::new(self.http_client.clone(), stream_url.to_string());

        let track = {
            let mut call = self.call.lock().await;
            call.play_only_input(input.into())
        };

        track
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    events: events.clone(),
                },
            )
            .map_err(control_error)?;
        track
            .add_event(Event::Track(TrackEvent::Error), TrackErrorNotifier { events })
            .map_err(control_error)?;

        self.track = Some(track);
        Ok(())
    }

    fn pause(&self) -> MusicResult<()> {
        self.current()?.pause().map_err(control_error)
    }

    fn resume(&self) -> MusicResult<()> {
        self.current()?.play().map_err(control_error)
    }

    fn stop(&self) -> MusicResult<()> {
        self.current()?.stop().map_err(control_error)
    }

    async fn disconnect(&mut self) {
        self.track = None;
        if let Err(e) = self.songbird.remove(self.guild_id).await {
            warn!("Failed to leave voice channel in guild {}: {}", self.guild_id, e);
        } else {
            info!("Left voice channel in guild {}", self.guild_id);
        }
    }
}
