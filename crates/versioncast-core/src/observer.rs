//! Observer sessions and the delivery contract for transports.
//!
//! An [`ObserverSession`] follows a [`VersionedCell`] on behalf of one
//! client. Each call to [`ObserverSession::next`] yields a snapshot
//! strictly newer than the last one it returned, blocking in
//! [`VersionedCell::wait_for_change`] when there is nothing new.
//! Versions published while the observer was busy are skipped; the
//! observer always jumps to the newest.
//!
//! Transports plug in through [`DeliverySink`] and drive the session
//! with [`run_observer`], which detaches on the first delivery failure
//! or when the session's [`CancelSignal`] fires.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::cell::VersionedCell;
use crate::signal::CancelSignal;
use crate::snapshot::Snapshot;

/// Failure to hand a snapshot to a client.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The peer has gone away.
    #[error("connection closed")]
    Closed,

    /// The snapshot could not be encoded for the wire.
    #[error("encode error: {message}")]
    Encode {
        /// Description of the encoding failure.
        message: String,
    },

    /// The transport reported an error while sending.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

/// Per-observer sink a transport implements.
pub trait DeliverySink {
    /// Deliver one snapshot to the client.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the client can no longer be reached.
    /// The observer detaches on the first error.
    fn deliver(
        &mut self,
        snapshot: &Snapshot,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Why an observer loop exited.
#[derive(Debug)]
pub enum DetachReason {
    /// The observer's cancel signal fired.
    Cancelled,
    /// The sink rejected a delivery.
    DeliveryFailed(DeliveryError),
}

/// One observer's view of a [`VersionedCell`].
///
/// Created by [`VersionedCell::attach`]. Counts toward the cell's
/// observer total until dropped.
#[derive(Debug)]
pub struct ObserverSession {
    cell: Arc<VersionedCell>,
    /// `None` until the first snapshot is returned.
    last_seen: Option<u64>,
}

impl ObserverSession {
    pub(crate) const fn new(cell: Arc<VersionedCell>) -> Self {
        Self {
            cell,
            last_seen: None,
        }
    }

    /// Version of the last snapshot returned, if any.
    pub const fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }

    /// The cell this session follows.
    pub const fn cell(&self) -> &Arc<VersionedCell> {
        &self.cell
    }

    /// Return the next snapshot newer than the last one returned.
    ///
    /// The first call returns the current snapshot immediately. Later
    /// calls wait until the cell moves past `last_seen`. Returns `None`
    /// once `cancel` has fired, including while waiting.
    pub async fn next(&mut self, cancel: &CancelSignal) -> Option<Arc<Snapshot>> {
        if cancel.is_cancelled() {
            return None;
        }

        let current = self.cell.read();
        let snapshot = match self.last_seen {
            Some(seen) if current.version() == seen => {
                let changed = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    changed = self.cell.wait_for_change(seen) => Some(changed),
                };
                changed?
            }
            _ => current,
        };

        self.last_seen = Some(snapshot.version());
        Some(snapshot)
    }
}

impl Drop for ObserverSession {
    fn drop(&mut self) {
        self.cell.detach();
    }
}

/// Feed snapshots from `session` into `sink` until detach.
///
/// Never busy-polls: between versions the task is parked in the cell's
/// wait. A delivery that hangs is abandoned when `cancel` fires.
pub async fn run_observer<S: DeliverySink>(
    session: &mut ObserverSession,
    sink: &mut S,
    cancel: &CancelSignal,
) -> DetachReason {
    while let Some(snapshot) = session.next(cancel).await {
        let delivered = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = sink.deliver(&snapshot) => Some(result),
        };

        match delivered {
            None => return DetachReason::Cancelled,
            Some(Err(e)) => {
                debug!(
                    version = snapshot.version(),
                    error = %e,
                    "Delivery failed, detaching observer"
                );
                return DetachReason::DeliveryFailed(e);
            }
            Some(Ok(())) => {}
        }
    }

    DetachReason::Cancelled
}
