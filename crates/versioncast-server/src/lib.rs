//! HTTP and `WebSocket` transport for versioncast.
//!
//! This crate provides an Axum server that exposes one
//! [`VersionedCell`] to clients:
//!
//! - **Snapshot fetch** (`GET /`) returns the current snapshot as a
//!   one-shot JSON document `{"version": .., "body": ..}`.
//! - **Change feed** (`GET /ws`) upgrades to a `WebSocket` and pushes
//!   every new version as it is published, skipping versions the client
//!   was too slow to receive.
//! - **Status** (`GET /api/status`) reports the current version, the
//!   attached observer count, and the broadcast loop's phase.
//!
//! # Architecture
//!
//! Each feed connection is an [`ObserverSession`] driven by
//! [`run_observer`]. There are no per-client queues or channels: the
//! connection task parks in the cell's wait primitive and wakes with
//! every publish.
//!
//! [`VersionedCell`]: versioncast_core::VersionedCell
//! [`ObserverSession`]: versioncast_core::ObserverSession
//! [`run_observer`]: versioncast_core::run_observer

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{serve_on, start_server, ServerError};
pub use startup::spawn_server;
pub use state::{AppState, StatusReport};
