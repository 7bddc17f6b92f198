use std::sync::Arc;

use mirrorbook::api::router::create_router;
use mirrorbook::config::AppConfig;
use mirrorbook::services::trade_poller::run_trade_poller;
use mirrorbook::store::{MemoryStore, PgStore, Store};
use mirrorbook::upstream::BrokerClient;
use mirrorbook::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let store = PgStore::connect(url).await?;
            tracing::info!("Database connected");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set — using in-memory store, state is not durable");
            Arc::new(MemoryStore::new())
        }
    };

    let upstream = Arc::new(BrokerClient::new(
        reqwest::Client::new(),
        config.broker_api_url.clone(),
    ));

    let metrics_handle = mirrorbook::metrics::init_metrics()?;

    let state = AppState::new(store, upstream, config.clone(), metrics_handle);

    // --- Background poller: detect master trades, fan out to followers ---
    if config.poller_enabled {
        let poller_state = state.clone();
        let interval = config.poll_interval_secs;
        tokio::spawn(async move {
            run_trade_poller(poller_state, interval).await;
        });
    } else {
        tracing::info!("Trade poller disabled (POLLER_ENABLED=false)");
    }

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
