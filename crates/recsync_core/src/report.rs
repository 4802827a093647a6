//! Outcome of one reconciliation pass.

use crate::error::SyncError;
use crate::record::RowId;
use std::time::Duration;

/// A single item a pass could not process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Remote id, or local row id, of the item.
    pub item: String,
    /// What went wrong.
    pub error: SyncError,
}

/// What one pass over one mapping did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Local rows created, including parents and children.
    pub created: Vec<RowId>,
    /// Local rows updated.
    pub updated: Vec<RowId>,
    /// Local rows deleted.
    pub deleted: Vec<RowId>,
    /// Items examined and left as they were.
    pub unchanged: usize,
    /// Items skipped, by remote id.
    pub skipped: Vec<String>,
    /// Items that failed.
    pub failures: Vec<ItemFailure>,
    /// Whether the mapping is passive and the pass did nothing.
    pub passive: bool,
    /// Time the pass took.
    pub duration: Duration,
}

impl PassReport {
    /// Report for a pass that did not run because the mapping is passive.
    pub fn passive() -> Self {
        Self {
            passive: true,
            ..Self::default()
        }
    }

    /// Returns true if no item failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of local rows the pass wrote or removed.
    pub fn changes(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    pub(crate) fn fail(&mut self, item: impl Into<String>, error: SyncError) {
        let item = item.into();
        tracing::warn!(%item, %error, "item failed");
        self.failures.push(ItemFailure { item, error });
    }
}
