pub mod api;
pub mod config;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;
pub mod upstream;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::services::trade_poller::PollReport;
use crate::store::Store;
use crate::upstream::TradeSource;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub upstream: Arc<dyn TradeSource>,
    pub config: AppConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    pub last_cycle: Arc<RwLock<Option<PollReport>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        upstream: Arc<dyn TradeSource>,
        config: AppConfig,
        metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        Self {
            store,
            upstream,
            config,
            metrics_handle,
            last_cycle: Arc::new(RwLock::new(None)),
        }
    }
}
