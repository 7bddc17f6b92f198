use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::followers::ApiResponse;
use crate::errors::CopyError;
use crate::models::{CopyTrade, MasterTrade};
use crate::AppState;

#[derive(Deserialize)]
pub struct TradeQuery {
    pub account: Option<String>,
}

/// GET /api/trades?account={id} — detected master trades, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<TradeQuery>,
) -> Result<Json<ApiResponse<Vec<MasterTrade>>>, CopyError> {
    let account = query
        .account
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CopyError::Validation("account query parameter is required".into()))?;

    let trades = state.store.master_trades_by_account(account).await?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(trades),
        error: None,
    }))
}

/// GET /api/trades/{id}/copy-trades — fan-out of one master trade
pub async fn copy_trades(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<CopyTrade>>>, CopyError> {
    let trades = state.store.copy_trades_by_master_trade(&id).await?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(trades),
        error: None,
    }))
}
