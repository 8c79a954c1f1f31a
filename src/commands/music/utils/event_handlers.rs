use serenity::async_trait;
use songbird::tracks::PlayMode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::session::SessionCommand;

/// Routes track events back into the session that started the track.
///
/// Each sink is tagged with the generation of the track it was armed for, so
/// events from a track the session already moved past are ignored.
#[derive(Clone)]
pub struct TrackEventSink {
    generation: u64,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl TrackEventSink {
    pub(crate) fn new(generation: u64, commands: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self {
            generation,
            commands,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The track played to its end or was stopped.
    pub fn finished(&self) {
        let _ = self.commands.send(SessionCommand::TrackEnded {
            generation: self.generation,
        });
    }

    /// The player gave up on the track.
    pub fn errored(&self, reason: impl Into<String>) {
        let _ = self.commands.send(SessionCommand::TrackFailed {
            generation: self.generation,
            reason: reason.into(),
        });
    }
}

/// Event handler for when a song ends
pub struct TrackEndNotifier {
    pub events: TrackEventSink,
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(_) = ctx {
            debug!("Track {} ended", self.events.generation());
            self.events.finished();
        }
        None
    }
}

/// Event handler for when the player reports an error on the track
pub struct TrackErrorNotifier {
    pub events: TrackEventSink,
}

#[async_trait]
impl songbird::EventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            let reason = tracks
                .first()
                .map(|(state, _)| failure_reason(&state.playing))
                .unwrap_or_else(|| "unknown error".to_string());
            warn!("Track {} errored: {}", self.events.generation(), reason);
            self.events.errored(reason);
        }
        None
    }
}

/// Readable description of why a track stopped, suitable for the text channel.
fn failure_reason(mode: &PlayMode) -> String {
    match mode {
        PlayMode::Errored(err) => err.to_string(),
        other => format!("track stopped unexpectedly ({:?})", other),
    }
}
