use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use duet_bot::config::AppConfig;
use duet_bot::engine::{Engine, Pacing};
use duet_bot::messenger::{GraphClient, Messenger};
use duet_bot::scheduler::Scheduler;
use duet_bot::store::Store;
use duet_bot::{router, AppState};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,duet_bot=debug,tower_http=debug"));

    let is_production = std::env::var("DUET_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    if is_production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load()?;
    let port = config.port;

    let store = Store::open(&config.database_url)?;

    if config.page_access_token.is_empty() {
        tracing::warn!("page access token not configured, outbound sends will fail");
    }
    if config.app_secret.is_none() {
        tracing::warn!("app secret not configured, webhook signatures will not be checked");
    }

    let messenger: Arc<dyn Messenger> = Arc::new(GraphClient::new(
        &config.graph_api_url,
        &config.page_access_token,
    ));
    let scheduler = Scheduler::new();
    let engine = Engine::new(store, messenger, scheduler.clone(), Pacing::default());

    let state = Arc::new(AppState { config, engine });
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "duet-bot starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // In-flight handlers drain; follow-ups still waiting on their delay are
    // dropped.
    scheduler.shutdown().await;
    tracing::info!("duet-bot stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
