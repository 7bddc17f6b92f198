use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::services::trade_poller::run_poll_cycle;
use crate::AppState;

/// POST /api/poll — run one polling pass right now
///
/// Shares `run_poll_cycle` with the background loop; triggering it twice
/// in a row is harmless because the feed dedup absorbs the overlap.
pub async fn trigger(State(state): State<AppState>) -> Json<serde_json::Value> {
    let report = run_poll_cycle(&state).await;
    Json(json!({ "success": true, "report": report }))
}

/// GET /api/poll/status — most recent cycle, if any
pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let last = state.last_cycle.read().await.clone();
    Json(json!({ "success": true, "last_cycle": last }))
}
