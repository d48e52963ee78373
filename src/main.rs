use ::serenity::all::ClientBuilder;
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jukebox::commands::music::audio_sources::spotify::SpotifyApi;
use jukebox::commands::music::audio_sources::youtube::YoutubeApi;
use jukebox::commands::music::audio_sources::{AudioApi, QueryResolver, SearchApi};
use jukebox::commands::music::commands as music_commands;
use jukebox::commands::music::utils::music_manager::MusicManager;
use jukebox::commands::music::utils::poller::BackgroundPoller;
use jukebox::config::Config;
use jukebox::{Data, Error, events, help, register};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jukebox=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    let config = Config::from_env()?;

    let music = Arc::new(MusicManager::new(Arc::new(build_resolver(&config))));

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let mut commands = vec![register(), help()];
    commands.extend(music_commands());

    let (ready_tx, ready_rx) = watch::channel(false);
    let shutdown = CancellationToken::new();

    let poller = BackgroundPoller::new(
        Arc::clone(music.controller()),
        Arc::clone(music.sessions()),
        config.poll_interval,
    );
    let poller_task = tokio::spawn(poller.run(ready_rx, shutdown.clone()));

    let data = Data {
        music: Arc::clone(&music),
    };

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                // The gateway is up; the poller may start touching voice sessions.
                if ready_tx.send(true).is_err() {
                    warn!("Poller dropped before the client became ready");
                }
                Ok(data)
            })
        });

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework.build())
        .register_songbird()
        .await?;

    let shard_manager = client.shard_manager.clone();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        info!("Shutting down");
        ctrl_c_shutdown.cancel();
        shard_manager.shutdown_all().await;
    });

    let result = client.start().await;

    shutdown.cancel();
    if let Err(e) = poller_task.await {
        error!("Poller task failed: {}", e);
    }

    result.map_err(Into::into)
}

/// YouTube handles search and YouTube links; Spotify links are added when credentials exist.
fn build_resolver(config: &Config) -> QueryResolver {
    let youtube = Arc::new(YoutubeApi::new(config.ytdlp_path.clone()));
    let search: Arc<dyn SearchApi> = youtube.clone();

    let mut apis: Vec<Arc<dyn AudioApi>> = vec![youtube];
    match &config.spotify {
        Some(credentials) => {
            apis.push(Arc::new(SpotifyApi::new(
                credentials.clone(),
                Arc::clone(&search),
            )));
        }
        None => info!("Spotify credentials not set, Spotify links are disabled"),
    }

    QueryResolver::new(apis, search, config.resolve_timeout)
}
