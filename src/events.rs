use serenity::all::{Context, FullEvent, Interaction};
use tracing::{error, info};

use crate::commands::music::utils::component_handlers;
use crate::{Data, Error};

/// Gateway events the framework does not handle itself.
pub async fn event_handler(
    ctx: &Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Bot is ready! Logged in as {}", data_about_bot.user.tag());
        }
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } => {
            if let Err(e) = component_handlers::handle_interaction(ctx, component, data).await {
                error!("Error handling component interaction: {}", e);
            }
        }
        _ => {}
    }
    Ok(())
}
