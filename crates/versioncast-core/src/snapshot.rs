//! The immutable value carried by a [`VersionedCell`].
//!
//! [`VersionedCell`]: crate::cell::VersionedCell

use serde::{Deserialize, Serialize};

/// One published version of the broadcast state.
///
/// Fields are private so a snapshot cannot change after construction.
/// Publishing replaces the cell's `Arc<Snapshot>`; it never edits one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    version: u64,
    body: String,
}

impl Snapshot {
    /// Create a snapshot for the given version.
    pub fn new(version: u64, body: impl Into<String>) -> Self {
        Self {
            version,
            body: body.into(),
        }
    }

    /// Create the version-0 snapshot a cell starts with.
    pub fn initial(body: impl Into<String>) -> Self {
        Self::new(0, body)
    }

    /// The monotonically increasing version number.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// The payload.
    pub fn body(&self) -> &str {
        &self.body
    }
}
