//! API Routes
//!
//! Configures the Axum router with the cache admin endpoints and the
//! upstream pass-through.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, health_handler, invalidate_handler, proxy_get_handler, proxy_write_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/*path` - Cached, coalesced read from upstream
/// - `POST|PUT|PATCH|DELETE /api/*path` - Write pass-through, invalidates the namespace
/// - `POST /cache/invalidate` - Drop every key under a prefix
/// - `DELETE /cache` - Drop everything
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/*path",
            get(proxy_get_handler)
                .post(proxy_write_handler)
                .put(proxy_write_handler)
                .patch(proxy_write_handler)
                .delete(proxy_write_handler),
        )
        .route("/cache", delete(clear_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
