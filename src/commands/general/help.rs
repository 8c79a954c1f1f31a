use crate::commands::music::utils::embedded_messages;
use crate::{CommandResult, Context};

/// Show the available commands
#[poise::command(prefix_command, slash_command, category = "General")]
pub async fn help(ctx: Context<'_>) -> CommandResult {
    ctx.send(embedded_messages::help(&ctx.data().prefix)).await?;
    Ok(())
}
