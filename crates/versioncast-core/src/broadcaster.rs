//! The broadcast loop: the single producer that drives a cell forward.
//!
//! [`BroadcastLoop`] wakes on a fixed interval, asks its
//! [`SnapshotSource`] for the next body, and publishes `last + 1` into
//! the [`VersionedCell`]. It is the only writer, which is what lets
//! readers get away with a bare atomic pointer load.
//!
//! The loop ends when its [`CancelSignal`] fires, when the configured
//! `max_ticks` have been published, or when the version counter would
//! overflow. The reason is returned in a [`BroadcastReport`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cell::VersionedCell;
use crate::config::BroadcastConfig;
use crate::signal::CancelSignal;
use crate::snapshot::Snapshot;
use crate::source::SnapshotSource;
use crate::status::{LoopPhase, LoopStatus};

/// Why the broadcast loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancel signal fired.
    Cancelled,
    /// `max_ticks` snapshots were published.
    MaxTicksReached,
    /// The next version would overflow `u64`.
    VersionExhausted,
}

/// Summary returned when the loop reaches its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Why the loop stopped.
    pub reason: StopReason,
    /// Snapshots published by this loop.
    pub ticks_published: u64,
    /// Ticks skipped because the source failed or the publish was rejected.
    pub ticks_skipped: u64,
    /// Version held by the cell when the loop stopped.
    pub last_version: u64,
}

/// Errors from a spawned broadcast loop.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// The loop task panicked or was aborted.
    #[error("broadcast task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// The single producer for one [`VersionedCell`].
pub struct BroadcastLoop<S> {
    cell: Arc<VersionedCell>,
    source: S,
    interval: Duration,
    max_ticks: u64,
    status: Arc<LoopStatus>,
}

impl<S: SnapshotSource> BroadcastLoop<S> {
    /// Create a loop publishing into `cell` with bodies from `source`.
    pub fn new(cell: Arc<VersionedCell>, source: S, config: &BroadcastConfig) -> Self {
        Self {
            cell,
            source,
            interval: Duration::from_millis(config.tick_interval_ms),
            max_ticks: config.max_ticks,
            status: Arc::new(LoopStatus::new(config.tick_interval_ms)),
        }
    }

    /// Shared status handle, for the transport's diagnostics endpoint.
    pub fn status(&self) -> Arc<LoopStatus> {
        Arc::clone(&self.status)
    }

    /// Run until a stop condition is met.
    ///
    /// Waits one interval before each publish; the cell's initial
    /// snapshot stands as version 0 until then.
    pub async fn run(mut self, cancel: CancelSignal) -> BroadcastReport {
        let mut last_version = self.cell.version();
        let mut ticks_published: u64 = 0;
        let mut ticks_skipped: u64 = 0;

        info!(
            tick_interval_ms = self.status.tick_interval_ms(),
            max_ticks = self.max_ticks,
            start_version = last_version,
            "Broadcast loop starting"
        );

        let reason = loop {
            if wait_interval(self.interval, &cancel).await {
                break StopReason::Cancelled;
            }

            let Some(next) = last_version.checked_add(1) else {
                break StopReason::VersionExhausted;
            };

            self.status.set_phase(LoopPhase::Publishing);
            match self.source.next_body(next) {
                Ok(body) => {
                    if self.cell.publish(Snapshot::new(next, body)) {
                        last_version = next;
                        ticks_published = ticks_published.saturating_add(1);
                        self.status.record_published();
                        debug!(
                            version = next,
                            observers = self.cell.observer_count(),
                            "Snapshot published"
                        );
                    } else {
                        // Another writer got ahead of us; follow the cell.
                        last_version = self.cell.version();
                        ticks_skipped = ticks_skipped.saturating_add(1);
                        self.status.record_skipped();
                    }
                }
                Err(e) => {
                    ticks_skipped = ticks_skipped.saturating_add(1);
                    self.status.record_skipped();
                    warn!(version = next, error = %e, "Snapshot source failed, skipping tick");
                }
            }
            self.status.set_phase(LoopPhase::Idle);

            if self.max_ticks > 0 && ticks_published >= self.max_ticks {
                break StopReason::MaxTicksReached;
            }
        };

        self.status.set_phase(LoopPhase::Stopped);

        BroadcastReport {
            reason,
            ticks_published,
            ticks_skipped,
            last_version: self.cell.version(),
        }
    }
}

impl<S: SnapshotSource + 'static> BroadcastLoop<S> {
    /// Run the loop on a background Tokio task.
    pub fn spawn(self) -> BroadcastHandle {
        let cancel = CancelSignal::new();
        let status = self.status();
        let task = tokio::spawn(self.run(cancel.clone()));
        BroadcastHandle {
            cancel,
            status,
            task,
        }
    }
}

/// Handle to a spawned [`BroadcastLoop`].
#[derive(Debug)]
pub struct BroadcastHandle {
    cancel: CancelSignal,
    status: Arc<LoopStatus>,
    task: JoinHandle<BroadcastReport>,
}

impl BroadcastHandle {
    /// Shared status of the running loop.
    pub fn status(&self) -> Arc<LoopStatus> {
        Arc::clone(&self.status)
    }

    /// A clone of the signal that stops this loop.
    ///
    /// Lets a caller stop the loop while [`join`](Self::join) is pending.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Whether the loop has already exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop to stop and wait for its report.
    pub async fn stop(self) -> Result<BroadcastReport, BroadcastError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the loop to stop on its own.
    pub async fn join(self) -> Result<BroadcastReport, BroadcastError> {
        Ok(self.task.await?)
    }
}

/// Sleep for one interval. Returns `true` if cancelled first.
async fn wait_interval(interval: Duration, cancel: &CancelSignal) -> bool {
    if interval.is_zero() {
        tokio::task::yield_now().await;
        return cancel.is_cancelled();
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => true,
        () = tokio::time::sleep(interval) => cancel.is_cancelled(),
    }
}

/// Log the terminal report of a broadcast loop.
pub fn log_report(report: &BroadcastReport) {
    info!(
        reason = ?report.reason,
        ticks_published = report.ticks_published,
        ticks_skipped = report.ticks_skipped,
        last_version = report.last_version,
        "Broadcast loop stopped"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use parking_lot::Mutex;

    use crate::source::{SourceError, TemplateSource};

    use super::*;

    fn config(tick_interval_ms: u64, max_ticks: u64) -> BroadcastConfig {
        BroadcastConfig {
            tick_interval_ms,
            max_ticks,
            ..BroadcastConfig::default()
        }
    }

    fn new_cell() -> Arc<VersionedCell> {
        Arc::new(VersionedCell::with_initial_body("Hello hello!"))
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_up_to_max_ticks() {
        let cell = new_cell();
        let requested = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&requested);
        let source = move |version: u64| {
            recorder.lock().push(version);
            Ok::<_, SourceError>(format!("body updated {version}"))
        };
        let broadcast = BroadcastLoop::new(Arc::clone(&cell), source, &config(250, 3));
        let status = broadcast.status();

        let report = broadcast.run(CancelSignal::new()).await;

        assert_eq!(report.reason, StopReason::MaxTicksReached);
        assert_eq!(*requested.lock(), vec![1, 2, 3]);
        assert_eq!(report.ticks_published, 3);
        assert_eq!(report.ticks_skipped, 0);
        assert_eq!(report.last_version, 3);
        assert_eq!(cell.read().body(), "body updated 3");
        assert_eq!(status.phase(), LoopPhase::Stopped);
        assert_eq!(status.ticks_published(), 3);
    }

    #[tokio::test]
    async fn cancel_stops_loop_during_long_interval() {
        let cell = new_cell();
        let source = TemplateSource::new("body updated {version}");
        let handle = BroadcastLoop::new(Arc::clone(&cell), source, &config(60_000, 0)).spawn();

        let report = tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.ticks_published, 0);
        assert_eq!(cell.version(), 0);
        assert_eq!(cell.read().body(), "Hello hello!");
    }

    #[tokio::test]
    async fn cancel_signal_stops_pending_join() {
        let cell = new_cell();
        let source = TemplateSource::new("body updated {version}");
        let handle = BroadcastLoop::new(Arc::clone(&cell), source, &config(60_000, 0)).spawn();
        let stopper = handle.cancel_signal();
        assert!(!handle.is_finished());

        let join = tokio::spawn(handle.join());
        stopper.cancel();

        let report = tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(report.reason, StopReason::Cancelled);
    }

    #[tokio::test]
    async fn already_cancelled_loop_publishes_nothing() {
        let cell = new_cell();
        let cancel = CancelSignal::new();
        cancel.cancel();

        let report = BroadcastLoop::new(Arc::clone(&cell), TemplateSource::new("x"), &config(0, 0))
            .run(cancel)
            .await;

        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(cell.version(), 0);
    }

    #[tokio::test]
    async fn failing_source_skips_ticks_without_gaps() {
        let cell = new_cell();
        let mut attempts = 0_u32;
        let source = move |version: u64| {
            attempts += 1;
            if attempts <= 2 {
                Err(SourceError::new("not ready"))
            } else {
                Ok(format!("body updated {version}"))
            }
        };

        let report = BroadcastLoop::new(Arc::clone(&cell), source, &config(0, 2))
            .run(CancelSignal::new())
            .await;

        assert_eq!(report.reason, StopReason::MaxTicksReached);
        assert_eq!(report.ticks_published, 2);
        assert_eq!(report.ticks_skipped, 2);
        assert_eq!(cell.version(), 2);
        assert_eq!(cell.read().body(), "body updated 2");
    }

    #[tokio::test]
    async fn stops_when_version_is_exhausted() {
        let cell = Arc::new(VersionedCell::new(Snapshot::new(u64::MAX - 1, "almost")));
        let report = BroadcastLoop::new(Arc::clone(&cell), TemplateSource::new("last"), &config(0, 0))
            .run(CancelSignal::new())
            .await;

        assert_eq!(report.reason, StopReason::VersionExhausted);
        assert_eq!(report.ticks_published, 1);
        assert_eq!(cell.version(), u64::MAX);
    }

    #[tokio::test]
    async fn continues_from_cell_version() {
        let cell = Arc::new(VersionedCell::new(Snapshot::new(10, "restored")));
        let report = BroadcastLoop::new(
            Arc::clone(&cell),
            TemplateSource::new("body updated {version}"),
            &config(0, 2),
        )
        .run(CancelSignal::new())
        .await;

        assert_eq!(report.last_version, 12);
        assert_eq!(cell.read().body(), "body updated 12");
    }
}
