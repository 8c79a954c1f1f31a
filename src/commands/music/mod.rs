//! Music commands. Every command talks to the guild's session through
//! [`utils::music_manager::MusicManager`], which lives in the bot's `Data`.

pub mod history;
pub mod pause;
pub mod play;
pub mod queue;
pub mod skip;
pub mod stop;

pub mod audio_sources;
pub mod utils;

use crate::{CommandResult, Context};
use utils::embedded_messages;
use utils::music_manager::MusicError;
