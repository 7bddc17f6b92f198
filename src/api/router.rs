use axum::middleware;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes — no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes — require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Dashboard
        .route("/api/dashboard/summary", get(handlers::dashboard::summary))
        // Followers
        .route(
            "/api/followers",
            get(handlers::followers::list).post(handlers::followers::register),
        )
        .route("/api/followers/:id", get(handlers::followers::detail))
        .route(
            "/api/followers/:id/copy-trades",
            get(handlers::followers::copy_trades),
        )
        // Consent gate
        .route("/api/followers/:id/consent", get(handlers::consent::status))
        .route(
            "/api/followers/:id/consent/stop",
            post(handlers::consent::stop),
        )
        .route(
            "/api/followers/:id/consent/resume",
            post(handlers::consent::resume),
        )
        // Master trades
        .route("/api/trades", get(handlers::trades::list))
        .route(
            "/api/trades/:id/copy-trades",
            get(handlers::trades::copy_trades),
        )
        // Replication ledger
        .route(
            "/api/copy-trades",
            get(handlers::copy_trades::list).post(handlers::copy_trades::create),
        )
        .route("/api/copy-trades/:id", get(handlers::copy_trades::detail))
        .route(
            "/api/copy-trades/:id/status",
            patch(handlers::copy_trades::update_status),
        )
        // Polling
        .route("/api/poll", post(handlers::poll::trigger))
        .route("/api/poll/status", get(handlers::poll::status))
        // Master account sessions
        .route("/api/accounts", get(handlers::accounts::list))
        .route(
            "/api/accounts/:id/token",
            put(handlers::accounts::put_token).delete(handlers::accounts::delete_token),
        )
        .layer(middleware::from_fn(require_auth));

    // CORS: dashboards are proxied same-origin; direct API access needs token
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
