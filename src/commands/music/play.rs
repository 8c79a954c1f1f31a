use super::*;
use crate::commands::music::utils::music_manager::MusicManager;
use poise::CreateReply;
use tracing::{debug, info, warn};

/// Play a song from YouTube by title or URL
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song title or YouTube URL"]
    #[rest]
    query: Option<String>,
) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let query = match query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => query.to_string(),
        _ => {
            ctx.send(embedded_messages::missing_query()).await?;
            return Ok(());
        }
    };

    // Get the user's voice channel
    let voice_channel = match MusicManager::get_user_voice_channel(
        ctx.serenity_context(),
        guild_id,
        ctx.author().id,
    ) {
        Ok(channel_id) => channel_id,
        Err(err) => {
            debug!("Rejecting play from {}: {}", ctx.author().id, err);
            ctx.send(embedded_messages::user_not_in_voice_channel())
                .await?;
            return Ok(());
        }
    };

    info!("Received play command with query: {}", query);

    let searching = ctx
        .send(CreateReply::default().content(embedded_messages::SEARCHING))
        .await?;

    let requested_by = ctx.author().tag();
    let reply = match ctx
        .data()
        .music
        .process_play_request(
            guild_id,
            voice_channel,
            ctx.channel_id(),
            &requested_by,
            &query,
        )
        .await
    {
        Ok((track, outcome)) => embedded_messages::added_to_queue(&track, &outcome),
        Err(err) => {
            warn!("Play request in guild {} failed: {}", guild_id, err);
            embedded_messages::play_failed(&err)
        }
    };

    searching.edit(ctx, reply).await?;

    Ok(())
}
