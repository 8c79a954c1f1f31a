use super::*;
use crate::utils::database::HISTORY_DISPLAY_LIMIT;
use poise::CreateReply;
use tracing::error;

/// Show recently played songs
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn history(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let Some(store) = ctx.data().history.clone() else {
        ctx.send(embedded_messages::history_unavailable()).await?;
        return Ok(());
    };

    let loading = ctx
        .send(CreateReply::default().content(embedded_messages::FETCHING_HISTORY))
        .await?;

    let reply = match store.recent(guild_id, HISTORY_DISPLAY_LIMIT).await {
        Ok(records) => embedded_messages::history(&records),
        Err(err) => {
            error!("Error retrieving song history: {}", err);
            embedded_messages::history_error(&err)
        }
    };

    loading.edit(ctx, reply).await?;
    Ok(())
}
