use serenity::all::{CreateMessage, Http};
use serenity::async_trait;
use serenity::model::id::ChannelId;
use std::sync::Arc;

use crate::Error;
use crate::commands::music::audio_sources::track_metadata::TrackMetadata;

use super::music_manager::MusicError;
use super::{button_controls, embedded_messages};

/// Where a session reports playback progress.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn now_playing(&self, channel_id: ChannelId, track: &TrackMetadata) -> Result<(), Error>;

    async fn playback_error(
        &self,
        channel_id: ChannelId,
        track: &TrackMetadata,
        error: &MusicError,
    ) -> Result<(), Error>;
}

/// Posts status messages into the guild's text channel.
pub struct ChannelNotifier {
    http: Arc<Http>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl StatusNotifier for ChannelNotifier {
    async fn now_playing(&self, channel_id: ChannelId, track: &TrackMetadata) -> Result<(), Error> {
        let message = CreateMessage::new()
            .embed(embedded_messages::now_playing(track))
            .components(button_controls::player_buttons(false));
        channel_id.send_message(&self.http, message).await?;
        Ok(())
    }

    async fn playback_error(
        &self,
        channel_id: ChannelId,
        track: &TrackMetadata,
        error: &MusicError,
    ) -> Result<(), Error> {
        channel_id
            .say(&self.http, embedded_messages::playback_error_text(track, error))
            .await?;
        Ok(())
    }
}
