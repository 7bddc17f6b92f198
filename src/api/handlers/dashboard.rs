use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::models::TradeStatus;
use crate::services::trade_poller::PollReport;
use crate::AppState;

#[derive(Serialize)]
pub struct DashboardSummary {
    pub followers: i64,
    pub active_followers: i64,
    pub pending: i64,
    pub success: i64,
    pub failed: i64,
    pub cancelled: i64,
    pub last_cycle: Option<PollReport>,
}

/// GET /api/dashboard/summary — one-screen operational overview
pub async fn summary(State(state): State<AppState>) -> Json<DashboardSummary> {
    let followers = state.store.list_followers().await.unwrap_or_default();

    let mut active_followers = 0i64;
    for follower in &followers {
        if state
            .store
            .consent_is_active(&follower.id)
            .await
            .unwrap_or(true)
        {
            active_followers += 1;
        }
    }

    let counts = state
        .store
        .copy_trade_status_counts()
        .await
        .unwrap_or_default();
    let count = |status: TradeStatus| counts.get(&status).copied().unwrap_or(0);

    let last_cycle = state.last_cycle.read().await.clone();

    Json(DashboardSummary {
        followers: followers.len() as i64,
        active_followers,
        pending: count(TradeStatus::Pending),
        success: count(TradeStatus::Success),
        failed: count(TradeStatus::Failed),
        cancelled: count(TradeStatus::Cancelled),
        last_cycle,
    })
}
