//! Background server startup for the daemon.
//!
//! Provides [`spawn_server`] which binds the listener up front and then
//! serves on a background Tokio task, so the caller learns about bind
//! failures immediately and keeps running the broadcast loop alongside.
//!
//! # Usage
//!
//! ```rust,ignore
//! use versioncast_server::{spawn_server, AppState};
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(cell));
//! let (addr, handle) = spawn_server(&config.listen, Arc::clone(&state)).await?;
//! // ... later
//! state.shutdown.cancel();
//! handle.await??;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use versioncast_core::config::ListenConfig;

use crate::server::{self, ServerError};
use crate::state::AppState;

/// Bind `listen` and serve on a background task.
///
/// Returns the bound address (useful with port `0`) and the task handle,
/// which resolves once `state.shutdown` fires and the server drains.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the listener cannot be bound.
pub async fn spawn_server(
    listen: &ListenConfig,
    state: Arc<AppState>,
) -> Result<(SocketAddr, JoinHandle<Result<(), ServerError>>), ServerError> {
    let listener = server::bind(listen).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("local address unavailable: {e}")))?;

    let handle = tokio::spawn(server::serve_on(listener, state));

    tracing::info!(%addr, "Server spawned on background task");

    Ok((addr, handle))
}
