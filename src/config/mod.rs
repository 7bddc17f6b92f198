use std::env;

const DEFAULT_BROKER_API_URL: &str = "https://ant.aliceblueonline.com/rest/AliceBlueAPIService";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Unset means run on the in-memory store (dev / single node).
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,

    // Upstream brokerage
    pub broker_api_url: String,

    // Polling
    pub poll_interval_secs: u64,
    pub poller_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            broker_api_url: env::var("BROKER_API_URL")
                .unwrap_or_else(|_| DEFAULT_BROKER_API_URL.into()),

            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
            poller_enabled: env::var("POLLER_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
        })
    }
}
