use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wahuhuu::commands::general::help::help;
use wahuhuu::commands::music::audio_sources::youtube::YoutubeApi;
use wahuhuu::commands::music::{
    history::history as history_command, pause::pause, play::play, queue::queue, skip::skip, stop::stop,
};
use wahuhuu::commands::music::utils::music_manager::{MusicManager, MusicServices};
use wahuhuu::commands::music::utils::notifier::ChannelNotifier;
use wahuhuu::commands::music::utils::voice::SongbirdTransport;
use wahuhuu::config::Config;
use wahuhuu::events::event_handler;
use wahuhuu::utils::database::{HistoryStore, SqliteHistory};
use wahuhuu::{Context, Data, Error};

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("❌ An error occurred: {}", error)).await {
                warn!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wahuhuu=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Config::from_env()?;

    // History is optional; playback works without it
    let history: Option<Arc<dyn HistoryStore>> = match SqliteHistory::open(&config.history_db) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            error!("Failed to initialize history database: {}", e);
            None
        }
    };

    let songbird = Songbird::serenity();
    let transport = Arc::new(SongbirdTransport::new(
        Arc::clone(&songbird),
        reqwest::Client::new(),
    ));
    let resolver = Arc::new(YoutubeApi::new(config.ytdlp_path.clone()));

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let commands = vec![
        register(),
        help(),
        play(),
        stop(),
        pause(),
        skip(),
        queue(),
        history_command(),
    ];

    let prefix = config.prefix.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix.clone()),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let notifier = Arc::new(ChannelNotifier::new(ctx.http.clone()));
                let music = MusicManager::new(MusicServices {
                    resolver,
                    transport,
                    notifier,
                    history: history.clone(),
                });

                Ok(Data {
                    music,
                    history,
                    prefix,
                })
            })
        })
        .build();

    info!("Starting bot with prefix {}", config.prefix);

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .register_songbird_with(songbird)
        .await?;

    client.start().await.map_err(Into::into)
}
