use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::followers::ApiResponse;
use crate::errors::CopyError;
use crate::models::ConsentRecord;
use crate::AppState;

/// Fallback actor when the caller does not identify itself.
const DEFAULT_ACTOR: &str = "admin";

#[derive(Serialize)]
pub struct ConsentStatus {
    pub follower_id: String,
    pub copy_trading_active: bool,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stopped_by: Option<String>,
}

fn actor_from(headers: &HeaderMap) -> String {
    headers
        .get("x-master-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}

/// GET /api/followers/{id}/consent — current gate state
///
/// No stored record reads as active: the gate fails open.
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ConsentStatus>>, CopyError> {
    let record = state.store.get_consent(&id).await?;

    let status = match record {
        Some(record) => ConsentStatus {
            follower_id: record.follower_id,
            copy_trading_active: record.copy_trading_active,
            stopped_at: record.stopped_at,
            stopped_by: record.stopped_by,
        },
        None => ConsentStatus {
            follower_id: id,
            copy_trading_active: true,
            stopped_at: None,
            stopped_by: None,
        },
    };

    Ok(Json(ApiResponse {
        success: true,
        data: Some(status),
        error: None,
    }))
}

/// POST /api/followers/{id}/consent/stop — halt replication for a follower
pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ConsentRecord>>, CopyError> {
    let actor = actor_from(&headers);
    let record = state
        .store
        .set_consent(ConsentRecord::stopped(&id, &actor))
        .await?;

    tracing::warn!(follower = %id, actor = %actor, "Copy trading STOPPED via consent API");

    Ok(Json(ApiResponse {
        success: true,
        data: Some(record),
        error: None,
    }))
}

/// POST /api/followers/{id}/consent/resume — reopen the gate
pub async fn resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ConsentRecord>>, CopyError> {
    let actor = actor_from(&headers);
    let record = state
        .store
        .set_consent(ConsentRecord::resumed(&id))
        .await?;

    tracing::info!(follower = %id, actor = %actor, "Copy trading resumed via consent API");

    Ok(Json(ApiResponse {
        success: true,
        data: Some(record),
        error: None,
    }))
}
