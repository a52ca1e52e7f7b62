//! Versioned snapshot broadcasting for versioncast.
//!
//! A single producer regenerates one process-wide value on a fixed
//! interval and any number of observers follow it, each seeing only the
//! newest version. Observers never queue: a slow observer skips straight
//! to the latest snapshot.
//!
//! # Modules
//!
//! - [`snapshot`] -- Immutable `(version, body)` pair.
//! - [`cell`] -- [`VersionedCell`], the atomic publish / read / wait
//!   primitive shared by the producer and every observer.
//! - [`signal`] -- [`CancelSignal`] for producer shutdown and observer
//!   detach.
//! - [`source`] -- [`SnapshotSource`] trait and the template-based
//!   [`TemplateSource`].
//! - [`broadcaster`] -- [`BroadcastLoop`], the single writer.
//! - [`status`] -- [`LoopStatus`] diagnostics shared with the transport.
//! - [`observer`] -- [`ObserverSession`] and the [`DeliverySink`]
//!   contract the transport implements.
//! - [`config`] -- Configuration loading from `versioncast-config.yaml`.
//!
//! [`VersionedCell`]: cell::VersionedCell
//! [`CancelSignal`]: signal::CancelSignal
//! [`SnapshotSource`]: source::SnapshotSource
//! [`TemplateSource`]: source::TemplateSource
//! [`BroadcastLoop`]: broadcaster::BroadcastLoop
//! [`LoopStatus`]: status::LoopStatus
//! [`ObserverSession`]: observer::ObserverSession
//! [`DeliverySink`]: observer::DeliverySink

pub mod broadcaster;
pub mod cell;
pub mod config;
pub mod observer;
pub mod signal;
pub mod snapshot;
pub mod source;
pub mod status;

pub use broadcaster::{BroadcastHandle, BroadcastLoop, BroadcastReport, StopReason};
pub use cell::VersionedCell;
pub use observer::{run_observer, DeliveryError, DeliverySink, DetachReason, ObserverSession};
pub use signal::CancelSignal;
pub use snapshot::Snapshot;
pub use source::{SnapshotSource, SourceError, TemplateSource};
pub use status::{LoopPhase, LoopStatus};
