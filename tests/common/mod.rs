use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rust_decimal::Decimal;

use mirrorbook::api::router::create_router;
use mirrorbook::config::AppConfig;
use mirrorbook::errors::CopyError;
use mirrorbook::models::{Follower, RawTrade};
use mirrorbook::store::{MemoryStore, Store};
use mirrorbook::upstream::TradeSource;
use mirrorbook::AppState;

/// The Prometheus recorder is process-global; install it once per test
/// binary and hand out cheap handle clones.
fn test_metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("Failed to install Prometheus recorder")
        })
        .clone()
}

/// Trade source fed from canned batches. Each fetch for an account pops
/// its next batch (empty book once the script runs out); accounts can be
/// marked as unreachable. Every fetch is logged so tests can assert which
/// accounts were actually polled.
#[derive(Default)]
pub struct ScriptedSource {
    batches: Mutex<HashMap<String, VecDeque<Vec<RawTrade>>>>,
    unreachable: Mutex<HashSet<String>>,
    fetch_log: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, account_id: &str, batch: Vec<RawTrade>) {
        self.batches
            .lock()
            .unwrap()
            .entry(account_id.to_string())
            .or_default()
            .push_back(batch);
    }

    pub fn mark_unreachable(&self, account_id: &str) {
        self.unreachable
            .lock()
            .unwrap()
            .insert(account_id.to_string());
    }

    pub fn fetched_accounts(&self) -> Vec<String> {
        self.fetch_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeSource for ScriptedSource {
    async fn fetch_trades(
        &self,
        account_id: &str,
        _access_token: &str,
    ) -> Result<Vec<RawTrade>, CopyError> {
        self.fetch_log.lock().unwrap().push(account_id.to_string());

        if self.unreachable.lock().unwrap().contains(account_id) {
            return Err(CopyError::UpstreamUnavailable {
                account: account_id.to_string(),
                reason: "connection refused".into(),
            });
        }

        Ok(self
            .batches
            .lock()
            .unwrap()
            .get_mut(account_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default())
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub source: Arc<ScriptedSource>,
}

/// Memory-backed app with a scripted upstream; no external services.
pub async fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(ScriptedSource::new());

    let config = AppConfig {
        database_url: None,
        host: "127.0.0.1".into(),
        port: 0,
        broker_api_url: "http://localhost:0".into(),
        poll_interval_secs: 1,
        poller_enabled: false,
    };

    let state = AppState::new(
        store.clone(),
        source.clone(),
        config,
        test_metrics_handle(),
    );
    let router = create_router(state.clone());

    TestApp {
        router,
        state,
        store,
        source,
    }
}

/// Register a follower directly through the store.
#[allow(dead_code)]
pub async fn seed_follower(
    store: &dyn Store,
    id: &str,
    scaling_factor: Decimal,
    max_quantity: i64,
) -> Follower {
    let follower = Follower {
        id: id.into(),
        display_name: id.to_uppercase(),
        scaling_factor,
        max_quantity: Some(max_quantity),
        max_order_value: None,
        max_daily_loss: None,
        created_at: chrono::Utc::now(),
    };
    store
        .upsert_follower(follower)
        .await
        .expect("Failed to seed follower")
}

/// Broker-shaped trade-book row.
#[allow(dead_code)]
pub fn raw_trade(id: Option<&str>, symbol: &str, side: &str, quantity: i64) -> RawTrade {
    RawTrade {
        id: id.map(Into::into),
        order_id: None,
        symbol: Some(symbol.into()),
        side: Some(side.into()),
        quantity: Some(quantity),
        price: Some(Decimal::new(295_050, 2)), // 2950.50
        timestamp: Some("1755850000".into()),
    }
}

/// Decode a JSON response body.
#[allow(dead_code)]
pub async fn body_json(resp: axum::http::Response<axum::body::Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
