//! Broadcast loop diagnostics shared with the transport layer.
//!
//! [`LoopStatus`] is wrapped in [`Arc`](std::sync::Arc) and shared between
//! the broadcast loop and the status endpoint. All fields are atomics so
//! the loop never takes a lock to report progress.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the broadcast loop state machine.
///
/// `Idle -> Publishing -> Idle` on every tick; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    /// Waiting for the next tick.
    Idle,
    /// Building and publishing a snapshot.
    Publishing,
    /// The loop has exited.
    Stopped,
}

impl LoopPhase {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Publishing => 1,
            Self::Stopped => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Publishing,
            _ => Self::Stopped,
        }
    }
}

/// Shared broadcast loop status.
#[derive(Debug)]
pub struct LoopStatus {
    phase: AtomicU8,
    ticks_published: AtomicU64,
    ticks_skipped: AtomicU64,
    tick_interval_ms: u64,
    started_at: DateTime<Utc>,
}

impl LoopStatus {
    /// Create a status for a loop ticking every `tick_interval_ms`.
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            phase: AtomicU8::new(LoopPhase::Idle.as_u8()),
            ticks_published: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
            tick_interval_ms,
            started_at: Utc::now(),
        }
    }

    /// Current loop phase.
    pub fn phase(&self) -> LoopPhase {
        LoopPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: LoopPhase) {
        self.phase.store(phase.as_u8(), Ordering::Release);
    }

    /// Number of snapshots published so far.
    pub fn ticks_published(&self) -> u64 {
        self.ticks_published.load(Ordering::Relaxed)
    }

    pub(crate) fn record_published(&self) {
        self.ticks_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of ticks skipped because the source failed.
    pub fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped.load(Ordering::Relaxed)
    }

    pub(crate) fn record_skipped(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Configured tick interval in milliseconds.
    pub const fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Wall-clock time the status was created.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Seconds elapsed since [`started_at`](Self::started_at).
    pub fn uptime_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if the wall clock moved backwards.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}
