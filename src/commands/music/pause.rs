use super::*;

/// Pause or resume the current song
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let reply = match ctx.data().music.pause(guild_id).await {
        Ok(outcome) => embedded_messages::paused(&outcome),
        Err(MusicError::NoSession | MusicError::NothingPlaying) => {
            embedded_messages::nothing_playing()
        }
        Err(err) => embedded_messages::generic_error(&err.to_string()),
    };

    ctx.send(reply).await?;
    Ok(())
}
