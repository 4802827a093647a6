//! The has-one association.

use super::graph::Graph;
use super::nested::{build_children_of, ChildSide, Resolution};
use super::{BuildContext, BuildOutcome, Lookup, Owner};
use crate::error::SyncResult;
use crate::record::RemoteRecord;

/// One row of `target` links back to the owner through `inverse`, and its
/// remote record carries the owner's remote id in a lookup field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasOne {
    pub(super) name: String,
    pub(super) target: String,
    pub(super) inverse: String,
    pub(super) lookup: Lookup,
}

impl HasOne {
    /// Creates a has-one association.
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        inverse: impl Into<String>,
        lookup: impl Into<Lookup>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            inverse: inverse.into(),
            lookup: lookup.into(),
        }
    }

    /// Association name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target entity type.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Name of the link on the target row pointing back at the owner.
    pub fn inverse(&self) -> &str {
        &self.inverse
    }

    /// Lookup field(s) on the target's remote records.
    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// Builds the first target row whose remote record points at `remote`.
    pub fn build(
        &self,
        ctx: &BuildContext<'_>,
        owner: Owner<'_>,
        remote: &RemoteRecord,
    ) -> SyncResult<BuildOutcome> {
        let mut graph = Graph::default();
        match build_children_of(ctx, &self.side(), owner, remote, &mut graph)? {
            Resolution::Resolved => Ok(BuildOutcome::from_graph(graph)),
            Resolution::Unresolved => Ok(BuildOutcome::Unresolved),
        }
    }

    pub(super) fn side(&self) -> ChildSide<'_> {
        ChildSide {
            target: &self.target,
            inverse: &self.inverse,
            lookup: &self.lookup,
            limit: Some(1),
        }
    }
}
