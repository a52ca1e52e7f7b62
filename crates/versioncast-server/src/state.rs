//! Shared application state for the versioncast server.
//!
//! [`AppState`] hands every request handler the same [`VersionedCell`].
//! Handlers only read from it; the broadcast loop is the sole writer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use versioncast_core::{CancelSignal, LoopPhase, LoopStatus, Snapshot, VersionedCell};

/// JSON body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusReport {
    /// Version currently published.
    pub version: u64,
    /// Feed clients currently attached.
    pub observers: usize,
    /// Broadcast loop phase.
    pub phase: LoopPhase,
    /// Snapshots published since startup.
    pub ticks_published: u64,
    /// Ticks skipped because the source failed.
    pub ticks_skipped: u64,
    /// Configured tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// When the broadcast loop was created.
    pub started_at: DateTime<Utc>,
    /// Seconds since `started_at`.
    pub uptime_seconds: u64,
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The cell every endpoint reads from.
    pub cell: Arc<VersionedCell>,
    /// Broadcast loop diagnostics (present when a loop is running).
    pub loop_status: Option<Arc<LoopStatus>>,
    /// Fired on server shutdown; closes every feed connection.
    pub shutdown: CancelSignal,
}

impl AppState {
    /// Create state serving `cell` without loop diagnostics.
    pub fn new(cell: Arc<VersionedCell>) -> Self {
        Self {
            cell,
            loop_status: None,
            shutdown: CancelSignal::new(),
        }
    }

    /// Create state serving `cell` with the broadcast loop's status attached.
    pub fn with_loop_status(cell: Arc<VersionedCell>, status: Arc<LoopStatus>) -> Self {
        Self {
            loop_status: Some(status),
            ..Self::new(cell)
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.cell.read()
    }

    /// Assemble the status report, if a loop status is attached.
    pub fn status_report(&self) -> Option<StatusReport> {
        let status = self.loop_status.as_ref()?;
        Some(StatusReport {
            version: self.cell.version(),
            observers: self.cell.observer_count(),
            phase: status.phase(),
            ticks_published: status.ticks_published(),
            ticks_skipped: status.ticks_skipped(),
            tick_interval_ms: status.tick_interval_ms(),
            started_at: status.started_at(),
            uptime_seconds: status.uptime_seconds(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_report_requires_loop_status() {
        let cell = Arc::new(VersionedCell::with_initial_body("Hello hello!"));
        let state = AppState::new(cell);
        assert!(state.status_report().is_none());
    }

    #[test]
    fn status_report_reflects_cell() {
        let cell = Arc::new(VersionedCell::with_initial_body("Hello hello!"));
        cell.publish(Snapshot::new(4, "body updated 4"));
        let _session = cell.attach();

        let state = AppState::with_loop_status(Arc::clone(&cell), Arc::new(LoopStatus::new(250)));
        let report = state.status_report().unwrap();

        assert_eq!(report.version, 4);
        assert_eq!(report.observers, 1);
        assert_eq!(report.phase, LoopPhase::Idle);
        assert_eq!(report.tick_interval_ms, 250);
    }
}
