//! Revisions and the version-control seam

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::Path;

/// An immutable point in project history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    /// Opaque identifier (a commit hash for git)
    pub id: String,
    /// Timestamp as recorded in history; not guaranteed monotonic
    pub timestamp: DateTime<FixedOffset>,
}

impl Revision {
    pub fn new(id: impl Into<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            id: id.into(),
            timestamp,
        }
    }
}

/// Access to a project's history and its single shared working tree
///
/// Implementations list history oldest first. Every [`checkout`] overwrites
/// the same working tree, so callers must process revisions sequentially.
///
/// [`checkout`]: RevisionSource::checkout
pub trait RevisionSource {
    /// All revisions, ordered oldest to newest
    fn revisions(&self) -> Result<Vec<Revision>>;

    /// Force the working tree to match the given revision
    fn checkout(&self, id: &str) -> Result<()>;

    /// Root of the working tree that [`RevisionSource::checkout`] writes into
    fn work_tree(&self) -> &Path;
}
