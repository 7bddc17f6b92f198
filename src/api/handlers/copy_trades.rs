use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::followers::ApiResponse;
use crate::engine::quantity;
use crate::errors::CopyError;
use crate::models::{CopyTrade, Side, TradeStatus};
use crate::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Rows returned by ledger list endpoints when `?limit=` is absent.
pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct CopyTradeQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct CreateCopyTradeRequest {
    pub master_trade_id: String,
    pub follower_id: String,
    pub symbol: String,
    pub side: String,
    pub master_quantity: i64,
    pub price: Decimal,
    /// Omitted: computed from the follower's registered scaling config.
    pub follower_quantity: Option<i64>,
    /// Omitted: the entry starts PENDING.
    pub status: Option<String>,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

fn parse_status(raw: &str) -> Result<TradeStatus, CopyError> {
    TradeStatus::from_api_str(raw).ok_or_else(|| {
        CopyError::Validation(format!(
            "unknown status {raw:?}; expected PENDING, SUCCESS, FAILED or CANCELLED"
        ))
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/copy-trades — ledger, newest first, optional ?status= and ?limit=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CopyTradeQuery>,
) -> Result<Json<ApiResponse<Vec<CopyTrade>>>, CopyError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let mut trades = state.store.list_copy_trades(status).await?;
    trades.truncate(query.limit.unwrap_or(DEFAULT_LIST_LIMIT));

    Ok(Json(ApiResponse {
        success: true,
        data: Some(trades),
        error: None,
    }))
}

/// GET /api/copy-trades/{id} — single ledger entry
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CopyTrade>>, CopyError> {
    let trade = state
        .store
        .get_copy_trade(id)
        .await?
        .ok_or_else(|| CopyError::NotFound(format!("copy trade {id} not found")))?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(trade),
        error: None,
    }))
}

/// POST /api/copy-trades — append a ledger entry out of band
///
/// Operators use this to log manually replicated trades. The same
/// (master trade, follower) uniqueness applies, so an entry the engine
/// already wrote comes back as a 409.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateCopyTradeRequest>,
) -> Result<Json<ApiResponse<CopyTrade>>, CopyError> {
    for (field, value) in [
        ("master_trade_id", &body.master_trade_id),
        ("follower_id", &body.follower_id),
        ("symbol", &body.symbol),
    ] {
        if value.trim().is_empty() {
            return Err(CopyError::Validation(format!("{field} must not be empty")));
        }
    }

    let side = Side::from_api_str(&body.side)
        .ok_or_else(|| CopyError::Validation(format!("unknown side {:?}", body.side)))?;

    if body.master_quantity < 1 {
        return Err(CopyError::Validation(
            "master_quantity must be at least 1".into(),
        ));
    }
    if body.price <= Decimal::ZERO {
        return Err(CopyError::Validation("price must be positive".into()));
    }

    let follower_quantity = match body.follower_quantity {
        Some(quantity) if quantity >= 1 => quantity,
        Some(_) => {
            return Err(CopyError::Validation(
                "follower_quantity must be at least 1".into(),
            ))
        }
        None => {
            let follower = state
                .store
                .get_follower(&body.follower_id)
                .await?
                .ok_or_else(|| {
                    CopyError::NotFound(format!("follower {} not found", body.follower_id))
                })?;
            quantity::follower_quantity(body.master_quantity, &follower)
        }
    };

    let mut entry = CopyTrade::pending(
        body.master_trade_id,
        body.follower_id,
        body.symbol,
        side,
        body.master_quantity,
        follower_quantity,
        body.price,
    );
    if let Some(status) = body.status.as_deref() {
        entry.status = parse_status(status)?;
    }
    entry.reason = body.reason;

    let stored = state.store.append_copy_trade(entry).await?;
    tracing::info!(
        copy_trade = %stored.id,
        follower = %stored.follower_id,
        master_trade = %stored.master_trade_id,
        "Copy trade logged via API"
    );

    Ok(Json(ApiResponse {
        success: true,
        data: Some(stored),
        error: None,
    }))
}

/// PATCH /api/copy-trades/{id}/status — broker callback path
///
/// PENDING entries move to any state; terminal entries only accept a
/// replay of their current state.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<CopyTrade>>, CopyError> {
    let next = parse_status(&body.status)?;
    let updated = state
        .store
        .update_copy_trade_status(id, next, body.reason)
        .await?;

    metrics::counter!("status_updates_total").increment(1);
    tracing::info!(copy_trade = %id, status = %updated.status, "Copy trade status updated");

    Ok(Json(ApiResponse {
        success: true,
        data: Some(updated),
        error: None,
    }))
}
