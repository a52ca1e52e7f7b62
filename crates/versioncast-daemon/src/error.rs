//! Error types for the versioncast daemon.

/// Top-level error for the daemon binary.
///
/// Each variant wraps a subsystem error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: versioncast_core::config::ConfigError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: versioncast_server::ServerError,
    },

    /// The broadcast loop task failed.
    #[error("broadcast error: {source}")]
    Broadcast {
        /// The underlying broadcast error.
        #[from]
        source: versioncast_core::broadcaster::BroadcastError,
    },

    /// The server task panicked or was aborted.
    #[error("server task failed: {message}")]
    ServerTask {
        /// Description of the task failure.
        message: String,
    },
}
