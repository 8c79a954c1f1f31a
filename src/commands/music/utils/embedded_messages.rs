use poise::CreateReply;
use serenity::all::{CreateEmbed, CreateEmbedFooter, Timestamp};

use crate::commands::music::audio_sources::track_metadata::TrackMetadata;
use crate::utils::database::HistoryRecord;

use super::format_duration;
use super::music_manager::MusicError;
use super::session::{EnqueueOutcome, PauseOutcome, QueueSnapshot, SessionState};

const NOW_PLAYING_COLOR: u32 = 0xFF4500;
const ADDED_COLOR: u32 = 0x32CD32;
const QUEUE_COLOR: u32 = 0x9400D3;
const HISTORY_COLOR: u32 = 0x4B0082;
const HELP_COLOR: u32 = 0x00BFFF;

/// How many upcoming tracks the queue listing shows.
pub const QUEUE_DISPLAY_LIMIT: usize = 10;

pub const SEARCHING: &str = "🔍 Searching for your song...";
pub const FETCHING_HISTORY: &str = "📜 Fetching song history...";
pub const NOTHING_PLAYING: &str = "❌ Nothing is playing right now.";
pub const STOPPED: &str = "⏹️ Music playback stopped and queue cleared!";
pub const SKIPPED: &str = "⏭️ Skipped to the next song!";

fn text(content: impl Into<String>) -> CreateReply {
    CreateReply::default().content(content)
}

fn duration_text(track: &TrackMetadata) -> String {
    track
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Create an embed for when a song starts playing
pub fn now_playing(track: &TrackMetadata) -> CreateEmbed {
    let artist = track.artist.as_deref().unwrap_or("Unknown Artist");

    let mut embed = CreateEmbed::new()
        .title("🎶 **Now Playing** 🎶")
        .url(track.url())
        .description(format!(
            "**Song:** {}\n**Artist:** {}\n**Duration:** {}",
            track.title,
            artist,
            duration_text(track)
        ))
        .color(NOW_PLAYING_COLOR)
        .field("🎧 Audio Quality", "High", true)
        .field("⏯️ Current Status", "Playing", true)
        .field("🙋 Requested by", &track.requested_by, true)
        .footer(CreateEmbedFooter::new("Wahuhuu Music Bot"))
        .timestamp(Timestamp::now());

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.image(thumbnail);
    }

    embed
}

/// Create an embed for when a song is accepted into the queue
pub fn added_to_queue(track: &TrackMetadata, outcome: &EnqueueOutcome) -> CreateReply {
    let position = if outcome.starts_now {
        "Starting now".to_string()
    } else {
        format!("`#{}`", outcome.position)
    };

    let mut embed = CreateEmbed::new()
        .title("✅ Song Added to Queue")
        .description(format!("Added **{}** to the queue.", track.title))
        .field("Duration", format!("`{}`", duration_text(track)), true)
        .field("Position", position, true)
        .color(ADDED_COLOR);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    // replaces the "searching" placeholder text
    CreateReply::default().content("").embed(embed)
}

/// Numbered list of upcoming tracks, capped at [`QUEUE_DISPLAY_LIMIT`].
pub fn queue_listing(upcoming: &[TrackMetadata]) -> String {
    let mut description = String::new();

    for (index, track) in upcoming.iter().take(QUEUE_DISPLAY_LIMIT).enumerate() {
        description.push_str(&format!(
            "{}. **{}** (Requested by: {})\n",
            index + 1,
            track.title,
            track.requested_by
        ));
    }

    if upcoming.len() > QUEUE_DISPLAY_LIMIT {
        description.push_str(&format!(
            "\n...and {} more songs",
            upcoming.len() - QUEUE_DISPLAY_LIMIT
        ));
    }

    description
}

/// Create an embed for the music queue
pub fn music_queue(snapshot: &QueueSnapshot) -> CreateReply {
    let mut description = String::new();

    if let Some(current) = &snapshot.now_playing {
        let status = if snapshot.state.is_paused() {
            "⏸️ Paused"
        } else {
            "🎶 Now Playing"
        };
        description.push_str(&format!(
            "**{}:** [{}]({}) `{}`\n\n",
            status,
            current.title,
            current.url(),
            duration_text(current)
        ));
    } else if snapshot.state == SessionState::Starting {
        description.push_str("**⏳ Starting:** the next song is loading\n\n");
    }

    if snapshot.upcoming.is_empty() {
        description.push_str("Nothing queued after this song.");
    } else {
        description.push_str(&queue_listing(&snapshot.upcoming));
    }

    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🎵 Song Queue")
            .description(description)
            .color(QUEUE_COLOR)
            .timestamp(Timestamp::now()),
    )
}

pub fn queue_is_empty() -> CreateReply {
    text("❌ The queue is empty.")
}

/// Numbered list of history records, newest first as given.
pub fn history_listing(records: &[HistoryRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            format!(
                "{}. **{}** (Requested by: {}, Played: <t:{}:f>)\n",
                index + 1,
                record.title,
                record.requested_by,
                record.played_at.timestamp()
            )
        })
        .collect()
}

/// Create an embed listing recently played songs
pub fn history(records: &[HistoryRecord]) -> CreateReply {
    if records.is_empty() {
        return text("No song history available for this server.");
    }

    CreateReply::default().content("").embed(
        CreateEmbed::new()
            .title("🎵 Recently Played Songs")
            .description(history_listing(records))
            .color(HISTORY_COLOR)
            .timestamp(Timestamp::now()),
    )
}

pub fn history_unavailable() -> CreateReply {
    text("❌ Song history is not available (database not connected).")
}

pub fn history_error(err: &dyn std::error::Error) -> CreateReply {
    text(format!("❌ Error retrieving song history: {}", err))
}

/// Create the command overview
pub fn help(prefix: &str) -> CreateReply {
    let commands = [
        ("play <title or URL>", "Play a song from YouTube", false),
        ("stop", "Stop playing and clear the queue", true),
        ("pause", "Pause or resume the current song", true),
        ("skip", "Skip to the next song", true),
        ("queue", "Show the current song queue", true),
        ("history", "Show recently played songs", true),
        ("help", "Show this help message", true),
    ];

    let embed = commands.into_iter().fold(
        CreateEmbed::new()
            .title("🎮 Wahuhuu Music Bot Commands")
            .description("Here are the available commands:")
            .color(HELP_COLOR),
        |embed, (name, value, inline)| embed.field(format!("{}{}", prefix, name), value, inline),
    );

    CreateReply::default().embed(embed.footer(CreateEmbedFooter::new(format!("Prefix: {}", prefix))))
}

pub fn missing_query() -> CreateReply {
    text("❌ Please provide a song title or YouTube URL!")
}

pub fn user_not_in_voice_channel() -> CreateReply {
    text("❌ You need to be in a voice channel to use this command!").ephemeral(true)
}

pub fn nothing_playing() -> CreateReply {
    text(NOTHING_PLAYING)
}

/// Text for a failed `play` lookup or enqueue.
pub fn play_failed(err: &MusicError) -> CreateReply {
    let message = match err {
        MusicError::NotFound(_) => "❌ No results found for your search query.".to_string(),
        MusicError::NoPlayableFormat(_) => "❌ Could not find a valid video.".to_string(),
        other => format!("❌ Error: {}", other),
    };
    text(message)
}

pub fn stopped() -> CreateReply {
    text(STOPPED)
}

pub fn pause_text(outcome: &PauseOutcome) -> &'static str {
    match outcome {
        PauseOutcome::Paused(_) => "⏸️ Paused the music!",
        PauseOutcome::Resumed(_) => "▶️ Resumed the music!",
    }
}

pub fn paused(outcome: &PauseOutcome) -> CreateReply {
    text(pause_text(outcome))
}

pub fn skipped() -> CreateReply {
    text(SKIPPED)
}

/// Message posted in the text channel when a track could not be played.
pub fn playback_error_text(track: &TrackMetadata, err: &MusicError) -> String {
    format!("❌ Error playing song **{}**: {}", track.title, err)
}

pub fn generic_error(message: &str) -> CreateReply {
    text(format!("❌ An error occurred: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serenity::model::id::GuildId;

    fn track(n: usize) -> TrackMetadata {
        TrackMetadata {
            title: format!("Song {}", n),
            source_id: format!("id{:09}", n),
            duration: None,
            thumbnail: None,
            artist: None,
            requested_by: "listener".to_string(),
        }
    }

    #[test]
    fn short_queue_lists_every_track() {
        let upcoming: Vec<_> = (1..=2).map(track).collect();
        assert_eq!(
            queue_listing(&upcoming),
            "1. **Song 1** (Requested by: listener)\n2. **Song 2** (Requested by: listener)\n"
        );
    }

    #[test]
    fn long_queue_is_truncated_with_remainder() {
        let upcoming: Vec<_> = (1..=13).map(track).collect();
        let listing = queue_listing(&upcoming);

        assert_eq!(listing.lines().filter(|line| line.contains("**Song")).count(), 10);
        assert!(listing.contains("10. **Song 10**"));
        assert!(!listing.contains("Song 11"));
        assert!(listing.ends_with("\n...and 3 more songs"));
    }

    #[test]
    fn exactly_ten_has_no_remainder() {
        let upcoming: Vec<_> = (1..=10).map(track).collect();
        assert!(!queue_listing(&upcoming).contains("more songs"));
    }

    #[test]
    fn history_lines_carry_requester_and_time() {
        let played_at = Utc.with_ymd_and_hms(2024, 11, 25, 7, 48, 57).unwrap();
        let records = vec![HistoryRecord {
            guild_id: GuildId::new(1),
            title: "Song".to_string(),
            source_url: "https://www.youtube.com/watch?v=abc12345678".to_string(),
            requested_by: "listener".to_string(),
            played_at,
        }];

        assert_eq!(
            history_listing(&records),
            format!(
                "1. **Song** (Requested by: listener, Played: <t:{}:f>)\n",
                played_at.timestamp()
            )
        );
    }

    #[test]
    fn playback_error_names_the_track() {
        let text = playback_error_text(&track(1), &MusicError::NoPlayableFormat("id1".to_string()));
        assert_eq!(
            text,
            "❌ Error playing song **Song 1**: No suitable audio format found for id1"
        );
    }
}
