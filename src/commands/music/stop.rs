use super::*;

/// Stop playing, clear the queue and leave the voice channel
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let reply = match ctx.data().music.stop(guild_id).await {
        Ok(()) => embedded_messages::stopped(),
        Err(MusicError::NoSession) => embedded_messages::nothing_playing(),
        Err(err) => embedded_messages::generic_error(&err.to_string()),
    };

    ctx.send(reply).await?;
    Ok(())
}
