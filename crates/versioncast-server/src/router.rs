//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with request tracing and CORS enabled for cross-origin dashboards.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- current snapshot
/// - `GET /ws` -- `WebSocket` change feed
/// - `GET /api/status` -- broadcast diagnostics
///
/// Unknown paths get a JSON 404. CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Snapshot fetch
        .route("/", get(handlers::get_snapshot))
        // Change feed
        .route("/ws", get(ws::ws_feed))
        // Diagnostics
        .route("/api/status", get(handlers::get_status))
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
