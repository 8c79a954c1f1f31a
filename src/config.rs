//! Runtime configuration read from the environment (and `.env` via `dotenv`).

use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "w!";
pub const DEFAULT_HISTORY_DB: &str = "music_history.db";
pub const DEFAULT_YTDLP: &str = "yt-dlp";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("Environment variable {0} must not be empty")]
    EmptyVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub prefix: String,
    pub history_db: PathBuf,
    pub ytdlp_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN").ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?;
        if discord_token.trim().is_empty() {
            return Err(ConfigError::EmptyVar("DISCORD_TOKEN"));
        }

        let prefix = match lookup("COMMAND_PREFIX") {
            Some(prefix) if prefix.trim().is_empty() => {
                return Err(ConfigError::EmptyVar("COMMAND_PREFIX"));
            }
            Some(prefix) => prefix,
            None => DEFAULT_PREFIX.to_string(),
        };

        let history_db = lookup("HISTORY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_DB));

        let ytdlp_path = lookup("YTDLP_PATH").unwrap_or_else(|| DEFAULT_YTDLP.to_string());

        Ok(Self {
            discord_token,
            prefix,
            history_db,
            ytdlp_path,
        })
    }
}
