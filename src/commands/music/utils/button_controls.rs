use serenity::all::{ButtonStyle, CreateActionRow, CreateButton, ReactionType};

pub const STOP_BUTTON: &str = "stop";
pub const PAUSE_BUTTON: &str = "pause";
pub const SKIP_BUTTON: &str = "skip";

/// Creates the stop/pause/skip row shown under the now playing message.
///
/// `paused` relabels the middle button so it offers to resume.
pub fn player_buttons(paused: bool) -> Vec<CreateActionRow> {
    let stop = CreateButton::new(STOP_BUTTON)
        .emoji(ReactionType::Unicode("⏹️".to_string()))
        .style(ButtonStyle::Danger)
        .label("Stop");

    let pause = CreateButton::new(PAUSE_BUTTON)
        .emoji(ReactionType::Unicode(
            if paused { "▶️" } else { "⏸️" }.to_string(),
        ))
        .style(if paused {
            ButtonStyle::Primary
        } else {
            ButtonStyle::Secondary
        })
        .label(if paused { "Resume" } else { "Pause" });

    let skip = CreateButton::new(SKIP_BUTTON)
        .emoji(ReactionType::Unicode("⏭️".to_string()))
        .style(ButtonStyle::Primary)
        .label("Skip");

    vec![CreateActionRow::Buttons(vec![stop, pause, skip])]
}
