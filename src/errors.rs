use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::models::TradeStatus;

#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate entry: master trade {master_trade_id} already replicated for follower {follower_id}")]
    DuplicateEntry {
        master_trade_id: String,
        follower_id: String,
    },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TradeStatus, to: TradeStatus },

    #[error("Upstream unavailable for account {account}: {reason}")]
    UpstreamUnavailable { account: String, reason: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for CopyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CopyError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CopyError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CopyError::DuplicateEntry { .. } => (StatusCode::CONFLICT, self.to_string()),
            CopyError::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            CopyError::UpstreamUnavailable { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            CopyError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".into()),
            CopyError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for CopyError {
    fn from(e: sqlx::Error) -> Self {
        CopyError::Internal(e.into())
    }
}
