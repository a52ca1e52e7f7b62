//! REST endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Current snapshot `{version, body}` |
//! | `GET` | `/api/status` | Version, observer count, loop phase |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::Uri;
use versioncast_core::Snapshot;

use crate::error::ApiError;
use crate::state::{AppState, StatusReport};

/// Return the current snapshot as JSON.
///
/// Never blocks: this is a single atomic read of the cell.
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(Snapshot::clone(&state.snapshot()))
}

/// Return broadcast diagnostics.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusReport>, ApiError> {
    state
        .status_report()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no broadcast loop attached".to_owned()))
}

/// Fallback for unknown paths.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {uri}"))
}
