use std::sync::Arc;

use anyhow::Context as AnyhowContext;
use dotenv::dotenv;
use secrecy::ExposeSecret;
use serenity::prelude::*;

use feedhook::commands::Handler;
use feedhook::config::get_config_from_env;
use feedhook::db::BotDb;
use feedhook::flow::WebhookFlow;
use feedhook::http::{router, AppState};
use feedhook::notify::{DiscordFollowups, ResultNotifier};
use feedhook::oauth::DiscordOAuth;
use feedhook::registrar::SubscriptionRegistrar;
use feedhook::state::{spawn_sweeper, StateStore, SystemClock};
use feedhook::webhook::{DiscordWebhooks, WebhookProvisioner};

const SWEEP_INTERVAL: tokio::time::Duration = tokio::time::Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    let config = get_config_from_env()?;

    log::info!("Loading {}", config.db_path);

    let db = BotDb::open(&config.db_path)?;

    log::info!("Migrating database");

    db.migrate().await?;

    let states = StateStore::new(Arc::new(SystemClock), config.state_ttl);
    spawn_sweeper(states.clone(), SWEEP_INTERVAL);

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let flow = WebhookFlow::new(
        states.clone(),
        Arc::new(DiscordOAuth::new(http_client.clone(), config.oauth())),
        WebhookProvisioner::new(Arc::new(DiscordWebhooks::new(http_client.clone()))),
        SubscriptionRegistrar::new(Arc::new(db)),
        ResultNotifier::new(Arc::new(DiscordFollowups::new(
            http_client,
            config.application_id,
        ))),
    );

    let app = router(AppState {
        flow: Arc::new(flow),
        base_url: config.base_url.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    log::info!("Listening for OAuth callbacks on {}", config.listen_addr);

    tokio::spawn(async move {
        if let Err(why) = axum::serve(listener, app).await {
            log::error!("HTTP server stopped: {:?}", why);
        }
    });

    log::info!("Creating Discord client");

    let mut client = Client::builder(
        config.discord_token.expose_secret(),
        GatewayIntents::non_privileged(),
    )
    .application_id(config.application_id)
    .event_handler(Handler::new(states, config.oauth()))
    .await?;

    if let Err(why) = client.start().await {
        log::error!("An error occurred while running the client: {:?}", why);
    }

    Ok(())
}
