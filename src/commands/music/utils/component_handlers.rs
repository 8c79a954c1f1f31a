use serenity::all::{
    ComponentInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage,
    EditMessage,
};
use tracing::{debug, info, warn};

use crate::Data;

use super::button_controls::{self, PAUSE_BUTTON, SKIP_BUTTON, STOP_BUTTON};
use super::embedded_messages;
use super::music_manager::MusicError;
use super::session::PauseOutcome;

type ButtonInteractionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// The player controls attached to the now playing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Stop,
    Pause,
    Skip,
}

impl ButtonAction {
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            STOP_BUTTON => Some(Self::Stop),
            PAUSE_BUTTON => Some(Self::Pause),
            SKIP_BUTTON => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Handle a button interaction
pub async fn handle_interaction(
    ctx: &Context,
    interaction: &ComponentInteraction,
    data: &Data,
) -> ButtonInteractionResult {
    let Some(action) = ButtonAction::from_custom_id(&interaction.data.custom_id) else {
        debug!("Ignoring component {}", interaction.data.custom_id);
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return respond(ctx, interaction, &MusicError::NotInGuild.to_string(), true).await;
    };

    info!(
        "Button {:?} pressed by {} in guild {}",
        action, interaction.user.id, guild_id
    );

    let music = &data.music;
    match action {
        ButtonAction::Stop => match music.stop(guild_id).await {
            Ok(()) => respond(ctx, interaction, embedded_messages::STOPPED, false).await,
            Err(err) => error_response(ctx, interaction, err).await,
        },
        ButtonAction::Pause => match music.pause(guild_id).await {
            Ok(outcome) => {
                respond(ctx, interaction, embedded_messages::pause_text(&outcome), false).await?;
                let paused = matches!(outcome, PauseOutcome::Paused(_));
                update_pause_button(ctx, interaction, paused).await;
                Ok(())
            }
            Err(err) => error_response(ctx, interaction, err).await,
        },
        ButtonAction::Skip => match music.skip(guild_id).await {
            Ok(_) => respond(ctx, interaction, embedded_messages::SKIPPED, false).await,
            Err(err) => error_response(ctx, interaction, err).await,
        },
    }
}

/// Relabels the pause button on the message the button belongs to.
async fn update_pause_button(ctx: &Context, interaction: &ComponentInteraction, paused: bool) {
    let edit = EditMessage::new().components(button_controls::player_buttons(paused));
    if let Err(e) = interaction
        .channel_id
        .edit_message(&ctx.http, interaction.message.id, edit)
        .await
    {
        warn!("Failed to update player buttons: {}", e);
    }
}

async fn error_response(
    ctx: &Context,
    interaction: &ComponentInteraction,
    err: MusicError,
) -> ButtonInteractionResult {
    let content = match err {
        MusicError::NoSession | MusicError::NothingPlaying => {
            embedded_messages::NOTHING_PLAYING.to_string()
        }
        other => format!("❌ {}", other),
    };
    respond(ctx, interaction, &content, true).await
}

async fn respond(
    ctx: &Context,
    interaction: &ComponentInteraction,
    content: &str,
    ephemeral: bool,
) -> ButtonInteractionResult {
    interaction
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("stop", Some(ButtonAction::Stop))]
    #[test_case("pause", Some(ButtonAction::Pause))]
    #[test_case("skip", Some(ButtonAction::Skip))]
    #[test_case("music_play_pause", None ; "foreign id")]
    #[test_case("Stop", None ; "case sensitive")]
    fn parses_button_ids(custom_id: &str, expected: Option<ButtonAction>) {
        assert_eq!(ButtonAction::from_custom_id(custom_id), expected);
    }
}
