//! The belongs-to association.

use super::graph::Graph;
use super::nested::{build_primary, Resolution};
use super::{BuildContext, BuildOutcome, Lookup, Owner};
use crate::error::SyncResult;
use crate::record::RemoteRecord;

/// The owner row holds a foreign key to a row of `target`, and the owner's
/// remote record carries the remote id of the target's remote record in a
/// lookup field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BelongsTo {
    pub(super) name: String,
    pub(super) target: String,
    pub(super) lookup: Lookup,
}

impl BelongsTo {
    /// Creates a belongs-to association named `name` pointing at `target`.
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        lookup: impl Into<Lookup>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            lookup: lookup.into(),
        }
    }

    /// Association name, also the name of the owner's link.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target entity type.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Lookup field(s) on the owner's remote record.
    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// Builds the parent row for `remote`, then the parents and children
    /// of every resolved remote parent.
    ///
    /// Returns [`BuildOutcome::Unresolved`] as soon as one lookup id, here or
    /// in a nested belongs-to, does not resolve to a remote record, so a
    /// dangling lookup never produces a partial graph.
    pub fn build(
        &self,
        ctx: &BuildContext<'_>,
        owner: Owner<'_>,
        remote: &RemoteRecord,
    ) -> SyncResult<BuildOutcome> {
        let mut graph = Graph::from_origin(owner.entity, remote);
        match build_primary(ctx, self, owner, remote, &mut graph)? {
            Resolution::Resolved => Ok(BuildOutcome::from_graph(graph)),
            Resolution::Unresolved => Ok(BuildOutcome::Unresolved),
        }
    }
}
