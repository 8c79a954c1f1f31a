//! Common test utilities, fixtures, and mocks
//! Shared by the integration test crates under `tests/`

#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

use serenity::model::id::GuildId;
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing::Level;

use wahuhuu::commands::music::utils::music_manager::{MusicManager, MusicResult, MusicServices};
use wahuhuu::commands::music::utils::session::{EnqueueOutcome, QueueSnapshot, SessionState};

use fixtures::{REQUESTER, TEXT_CHANNEL, VOICE_CHANNEL};
use mocks::{FakeResolver, FakeTransport, MemoryHistory, RecordingNotifier};

static INIT: Once = Once::new();

/// Initialize tracing for tests
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Lets spawned tasks run without moving the clock.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// A manager wired to in-memory collaborators.
pub struct Harness {
    pub manager: MusicManager,
    pub resolver: Arc<FakeResolver>,
    pub transport: FakeTransport,
    pub notifier: Arc<RecordingNotifier>,
    pub history: Arc<MemoryHistory>,
}

impl Harness {
    pub fn new() -> Self {
        init();

        let resolver = Arc::new(FakeResolver::default());
        let transport = FakeTransport::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let history = Arc::new(MemoryHistory::default());

        let manager = MusicManager::new(MusicServices {
            resolver: resolver.clone(),
            transport: Arc::new(transport.clone()),
            notifier: notifier.clone(),
            history: Some(history.clone()),
        });

        Self {
            manager,
            resolver,
            transport,
            notifier,
            history,
        }
    }

    /// Resolves `title` and queues it from the default channels.
    pub async fn play(&self, guild_id: GuildId, title: &str) -> MusicResult<EnqueueOutcome> {
        let (_, outcome) = self
            .manager
            .process_play_request(guild_id, VOICE_CHANNEL, TEXT_CHANNEL, REQUESTER, title)
            .await?;
        settle().await;
        Ok(outcome)
    }

    /// Ends the current track and lets the session react.
    pub async fn finish(&self, guild_id: GuildId) {
        assert!(
            self.transport.finish_current(guild_id),
            "nothing was playing in {}",
            guild_id
        );
        settle().await;
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        self.manager.snapshot(guild_id).await
    }

    pub async fn state(&self, guild_id: GuildId) -> SessionState {
        self.snapshot(guild_id).await.state
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> Option<String> {
        self.snapshot(guild_id)
            .await
            .now_playing
            .map(|track| track.title)
    }

    /// Advances the paused clock and lets the session react.
    pub async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
        settle().await;
    }
}
