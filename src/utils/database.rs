//! Provides the play history store backed by the application's SQLite database.
//! One row is appended for every track that starts playing; rows are never
//! updated or deleted.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serenity::async_trait;
use serenity::model::id::GuildId;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

use crate::commands::music::audio_sources::track_metadata::TrackMetadata;

/// Number of rows shown by the `history` command.
pub const HISTORY_DISPLAY_LIMIT: usize = 10;

/// Errors raised while reading or writing play history
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Database connection lock was poisoned")]
    Poisoned,
}

/// A single played track.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub guild_id: GuildId,
    pub title: String,
    pub source_url: String,
    pub requested_by: String,
    pub played_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Builds a record for a track that has just started in `guild_id`.
    pub fn played_now(guild_id: GuildId, track: &TrackMetadata) -> Self {
        Self {
            guild_id,
            title: track.title.clone(),
            source_url: track.url(),
            requested_by: track.requested_by.clone(),
            played_at: Utc::now(),
        }
    }
}

/// Append-only persistence of played tracks, queryable by guild.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one record.
    async fn record(&self, entry: HistoryRecord) -> Result<(), HistoryError>;

    /// Returns at most `limit` records for `guild_id`, newest first.
    async fn recent(
        &self,
        guild_id: GuildId,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, HistoryError>;
}

/// SQLite implementation of [`HistoryStore`].
///
/// The connection is shared behind a mutex and every query runs on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqliteHistory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistory {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let conn = Connection::open(path.as_ref())?;
        info!("Opened history database at {:?}", path.as_ref());
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, HistoryError> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, HistoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, HistoryError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| HistoryError::Poisoned)?;
            op(&conn)
        })
        .await?
    }
}

/// Creates the `play_history` table and its lookup index if they don't exist.
fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS play_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            guild_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            source_url TEXT NOT NULL,
            requested_by TEXT NOT NULL,
            played_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_play_history_guild
            ON play_history (guild_id, played_at)",
        [],
    )?;

    Ok(())
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn record(&self, entry: HistoryRecord) -> Result<(), HistoryError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO play_history (guild_id, title, source_url, requested_by, played_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.guild_id.get() as i64,
                    entry.title,
                    entry.source_url,
                    entry.requested_by,
                    entry.played_at.timestamp_millis()
                ],
            )?;
            debug!("Saved '{}' to history for guild {}", entry.title, entry.guild_id);
            Ok(())
        })
        .await
    }

    async fn recent(
        &self,
        guild_id: GuildId,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, HistoryError> {
        self.with_conn(move |conn| {
            let mut statement = conn.prepare(
                "SELECT title, source_url, requested_by, played_at
                 FROM play_history
                 WHERE guild_id = ?1
                 ORDER BY played_at DESC, id DESC
                 LIMIT ?2",
            )?;

            let rows = statement.query_map(params![guild_id.get() as i64, limit as i64], |row| {
                let played_at: i64 = row.get(3)?;
                Ok(HistoryRecord {
                    guild_id,
                    title: row.get(0)?,
                    source_url: row.get(1)?,
                    requested_by: row.get(2)?,
                    played_at: DateTime::from_timestamp_millis(played_at).unwrap_or_default(),
                })
            })?;

            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}
