//! The versioned cell: single source of truth for the latest snapshot.
//!
//! # Architecture
//!
//! The current [`Snapshot`] lives behind an [`ArcSwap`], so [`read`]
//! is a wait-free pointer load and [`publish`] is a single atomic
//! pointer store. Readers never coordinate with the writer or with each
//! other.
//!
//! Waiting is the only place a lock is involved. The published version
//! is mirrored into a [`Mutex`] that guards the wait predicate
//! (`version != known`). Thread callers park on the paired [`Condvar`];
//! async callers park on a [`Notify`]. Both re-check the predicate under
//! the lock after registering interest, so a publish racing with a
//! waiter going to sleep is never missed.
//!
//! [`read`]: VersionedCell::read
//! [`publish`]: VersionedCell::publish

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arc_swap::ArcSwap;
use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::observer::ObserverSession;
use crate::snapshot::Snapshot;

/// Holds the current snapshot and wakes waiters when it changes.
///
/// Construct one per broadcast stream and share it as
/// `Arc<VersionedCell>` between the producer and every observer.
#[derive(Debug)]
pub struct VersionedCell {
    /// The published snapshot. Replaced, never mutated.
    current: ArcSwap<Snapshot>,

    /// Version of `current`, guarded for the wait predicate.
    published: Mutex<u64>,

    /// Wakes thread waiters on publish.
    changed: Condvar,

    /// Wakes async waiters on publish.
    notify: Notify,

    /// Attached observers. Diagnostic only.
    observers: AtomicUsize,
}

impl VersionedCell {
    /// Create a cell holding `initial`.
    pub fn new(initial: Snapshot) -> Self {
        let version = initial.version();
        Self {
            current: ArcSwap::from_pointee(initial),
            published: Mutex::new(version),
            changed: Condvar::new(),
            notify: Notify::new(),
            observers: AtomicUsize::new(0),
        }
    }

    /// Create a cell holding a version-0 snapshot with the given body.
    pub fn with_initial_body(body: impl Into<String>) -> Self {
        Self::new(Snapshot::initial(body))
    }

    /// Replace the current snapshot and wake every waiter.
    ///
    /// The version must be strictly greater than the current one. A
    /// stale or repeated version is rejected, leaving the cell unchanged,
    /// and `false` is returned.
    pub fn publish(&self, snapshot: Snapshot) -> bool {
        let version = snapshot.version();
        {
            let mut published = self.published.lock();
            if version <= *published {
                warn!(
                    version,
                    current = *published,
                    "Rejected publish of a non-increasing version"
                );
                return false;
            }
            self.current.store(Arc::new(snapshot));
            *published = version;
        }

        self.changed.notify_all();
        self.notify.notify_waiters();
        true
    }

    /// Return the current snapshot without blocking.
    pub fn read(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Return the current version without blocking.
    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// Block the calling thread until the version differs from `known`.
    ///
    /// Returns immediately if it already differs. The returned snapshot
    /// is the one that ended the wait or a later one.
    ///
    /// Do not call this from an async task; use
    /// [`wait_for_change`](Self::wait_for_change) instead.
    pub fn wait_for_change_blocking(&self, known: u64) -> Arc<Snapshot> {
        let mut published = self.published.lock();
        while *published == known {
            self.changed.wait(&mut published);
        }
        drop(published);
        self.read()
    }

    /// Wait until the version differs from `known`.
    ///
    /// Returns immediately if it already differs. Cancel-safe: dropping
    /// the future removes the waiter, so callers race it against their
    /// own cancellation or deadline.
    pub async fn wait_for_change(&self, known: u64) -> Arc<Snapshot> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before the re-check so a concurrent publish
            // between the check and the await still wakes us.
            notified.as_mut().enable();

            if *self.published.lock() != known {
                return self.read();
            }

            notified.await;
        }
    }

    /// Attach a new observer session to this cell.
    ///
    /// The session counts toward [`observer_count`](Self::observer_count)
    /// until it is dropped.
    pub fn attach(self: &Arc<Self>) -> ObserverSession {
        let before = self.observers.fetch_add(1, Ordering::Relaxed);
        debug!(observers = before.saturating_add(1), "Observer attached");
        ObserverSession::new(Arc::clone(self))
    }

    /// Number of currently attached observers.
    pub fn observer_count(&self) -> usize {
        self.observers.load(Ordering::Relaxed)
    }

    pub(crate) fn detach(&self) {
        let before = self.observers.fetch_sub(1, Ordering::Relaxed);
        debug!(observers = before.saturating_sub(1), "Observer detached");
    }
}
