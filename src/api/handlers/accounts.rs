use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::errors::CopyError;
use crate::AppState;

#[derive(Deserialize)]
pub struct PutTokenRequest {
    pub access_token: String,
}

/// GET /api/accounts — master accounts the poller will visit
pub async fn list(State(state): State<AppState>) -> Result<Json<serde_json::Value>, CopyError> {
    let accounts = state.store.accounts_with_tokens().await?;
    Ok(Json(json!({ "success": true, "accounts": accounts })))
}

/// PUT /api/accounts/{id}/token — store a broker session token
///
/// The token is opaque to the service; holding one is what makes the
/// account pollable.
pub async fn put_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PutTokenRequest>,
) -> Result<Json<serde_json::Value>, CopyError> {
    if body.access_token.trim().is_empty() {
        return Err(CopyError::Validation("access_token must not be empty".into()));
    }

    state
        .store
        .put_access_token(&id, body.access_token.trim())
        .await?;
    tracing::info!(account = %id, "Broker session token stored");

    Ok(Json(json!({ "success": true, "account_id": id, "connected": true })))
}

/// DELETE /api/accounts/{id}/token — disconnect a master account
pub async fn delete_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, CopyError> {
    let removed = state.store.delete_access_token(&id).await?;
    if !removed {
        return Err(CopyError::NotFound(format!(
            "no session token stored for account {id}"
        )));
    }

    tracing::info!(account = %id, "Broker session token removed");
    Ok(Json(json!({ "success": true, "account_id": id, "connected": false })))
}
