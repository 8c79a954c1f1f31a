use super::*;
use tracing::info;

/// Skip to the next song
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let reply = match ctx.data().music.skip(guild_id).await {
        Ok(track) => {
            info!("{} skipped '{}'", ctx.author().name, track.title);
            embedded_messages::skipped()
        }
        Err(MusicError::NoSession | MusicError::NothingPlaying) => {
            embedded_messages::nothing_playing()
        }
        Err(err) => embedded_messages::generic_error(&err.to_string()),
    };

    ctx.send(reply).await?;
    Ok(())
}
