//! Server lifecycle management.
//!
//! [`start_server`] binds the configured address and serves until the
//! state's shutdown [`CancelSignal`](versioncast_core::CancelSignal)
//! fires. [`serve_on`] does the same on an already-bound listener.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use versioncast_core::config::ListenConfig;

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Bind a listener for the configured address.
///
/// `host` may be an IP literal (v4 or bare v6) or a hostname such as
/// `localhost`; the first resolved address that binds wins.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the host does not resolve or the
/// port is in use.
pub async fn bind(listen: &ListenConfig) -> Result<TcpListener, ServerError> {
    TcpListener::bind((listen.host.as_str(), listen.port))
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {}: {e}", listen.address())))
}

/// Start the server.
///
/// Binds to the configured address and serves requests until
/// `state.shutdown` fires. Returns `Ok(())` on clean shutdown.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(listen: &ListenConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener = bind(listen).await?;
    serve_on(listener, state).await
}

/// Serve on an already-bound listener until `state.shutdown` fires.
///
/// Open feed connections are closed by the same signal, so graceful
/// shutdown does not wait for clients to leave on their own.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Serve(format!("local address unavailable: {e}")))?;
    let shutdown = state.shutdown.clone();
    let router = build_router(state);

    info!(%addr, "versioncast server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!(%addr, "versioncast server stopped");
    Ok(())
}
