use super::*;

/// Show the current song queue
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let snapshot = ctx.data().music.snapshot(guild_id).await;
    let reply = if snapshot.is_empty() {
        embedded_messages::queue_is_empty()
    } else {
        embedded_messages::music_queue(&snapshot)
    };

    ctx.send(reply).await?;
    Ok(())
}
