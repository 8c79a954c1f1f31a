//! Wahuhuu: a Discord music bot that queues YouTube audio per guild.

use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod events;
pub mod utils;

use commands::music::utils::music_manager::MusicManager;
use utils::database::HistoryStore;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data, which is stored and accessible in all command invocations
pub struct Data {
    /// Registry of per-guild playback sessions
    pub music: MusicManager,
    /// Play history, absent when the database could not be opened
    pub history: Option<Arc<dyn HistoryStore>>,
    /// Prefix used for text commands, shown in the help embed
    pub prefix: String,
}
