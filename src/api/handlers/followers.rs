use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::copy_trades::{CopyTradeQuery, DEFAULT_LIST_LIMIT};
use crate::errors::CopyError;
use crate::models::{CopyTrade, Follower};
use crate::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterFollowerRequest {
    pub id: String,
    pub display_name: String,
    pub scaling_factor: Decimal,
    pub max_quantity: Option<i64>,
    pub max_order_value: Option<Decimal>,
    pub max_daily_loss: Option<Decimal>,
}

/// GET /api/followers — list registered followers
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Follower>>>, CopyError> {
    let followers = state.store.list_followers().await?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(followers),
        error: None,
    }))
}

/// POST /api/followers — register (or reconfigure) a follower
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterFollowerRequest>,
) -> Result<Json<ApiResponse<Follower>>, CopyError> {
    let follower = Follower {
        id: body.id,
        display_name: body.display_name,
        scaling_factor: body.scaling_factor,
        max_quantity: body.max_quantity,
        max_order_value: body.max_order_value,
        max_daily_loss: body.max_daily_loss,
        created_at: Utc::now(),
    };
    follower.validate().map_err(CopyError::Validation)?;

    let stored = state.store.upsert_follower(follower).await?;
    tracing::info!(follower = %stored.id, "Follower registered");

    Ok(Json(ApiResponse {
        success: true,
        data: Some(stored),
        error: None,
    }))
}

/// GET /api/followers/{id} — follower detail
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Follower>>, CopyError> {
    let follower = state
        .store
        .get_follower(&id)
        .await?
        .ok_or_else(|| CopyError::NotFound(format!("follower {id} not found")))?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(follower),
        error: None,
    }))
}

/// GET /api/followers/{id}/copy-trades — replication history, newest
/// first, ?limit= rows (default 50)
pub async fn copy_trades(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CopyTradeQuery>,
) -> Result<Json<ApiResponse<Vec<CopyTrade>>>, CopyError> {
    let mut trades = state.store.copy_trades_by_follower(&id).await?;
    trades.truncate(query.limit.unwrap_or(DEFAULT_LIST_LIMIT));

    Ok(Json(ApiResponse {
        success: true,
        data: Some(trades),
        error: None,
    }))
}
