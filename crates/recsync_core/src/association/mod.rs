//! Association resolution.
//!
//! An association describes how a local row relates to rows of another
//! local entity type, and which remote field carries the identifier linking
//! the two remote records. Building an association turns the lookup fields
//! of one remote record into the ordered sequence of local rows that should
//! exist to represent it.
//!
//! ## Ordering
//!
//! A successful build returns rows in dependency order: element 0 is the
//! primary row and every [`RowRef::Pending`] held by a later element `i`
//! points at an element before `i`. Nested belongs-to parents are placed
//! ahead of the row that points at them. The primary row's own new parents
//! come after it, and [`persist_graph`] writes those links once the parents
//! are saved.

mod belongs_to;
mod graph;
mod has_many;
mod has_one;
mod nested;

pub use belongs_to::BelongsTo;
pub use graph::persist_graph;
pub use has_many::HasMany;
pub use has_one::HasOne;
pub(crate) use nested::build_with_children;

use crate::error::SyncResult;
use crate::record::{LocalRow, RemoteRecord, RowId, RowRef};
use crate::registry::Registry;
use crate::store::{LocalStore, RemoteStore};
use graph::Graph;
use std::collections::BTreeMap;

/// Remote field(s) holding the identifier an association follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The same field for every remote type.
    Field(String),
    /// A field per remote type of the mappings on the other side.
    PerType(BTreeMap<String, String>),
}

impl Lookup {
    /// Creates a per-remote-type lookup from `(remote type, field)` pairs.
    pub fn per_type<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Lookup::PerType(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The lookup field to use with mappings of `remote_type`.
    pub fn field_for(&self, remote_type: &str) -> Option<&str> {
        match self {
            Lookup::Field(field) => Some(field),
            Lookup::PerType(fields) => fields.get(remote_type).map(String::as_str),
        }
    }

    /// Every field named by the lookup.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Lookup::Field(field) => vec![field.as_str()],
            Lookup::PerType(fields) => fields.values().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Lookup {
    fn from(field: &str) -> Self {
        Lookup::Field(field.to_string())
    }
}

impl From<String> for Lookup {
    fn from(field: String) -> Self {
        Lookup::Field(field)
    }
}

/// The closed set of association kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Association {
    /// The owner row holds a foreign key to one target row.
    BelongsTo(BelongsTo),
    /// One target row holds a foreign key to the owner row.
    HasOne(HasOne),
    /// Many target rows hold a foreign key to the owner row.
    HasMany(HasMany),
}

impl Association {
    /// Association name.
    pub fn name(&self) -> &str {
        match self {
            Association::BelongsTo(a) => &a.name,
            Association::HasOne(a) => &a.name,
            Association::HasMany(a) => &a.name,
        }
    }

    /// Local entity type on the other side.
    pub fn target(&self) -> &str {
        match self {
            Association::BelongsTo(a) => &a.target,
            Association::HasOne(a) => &a.target,
            Association::HasMany(a) => &a.target,
        }
    }

    /// Remote lookup field(s).
    pub fn lookup(&self) -> &Lookup {
        match self {
            Association::BelongsTo(a) => &a.lookup,
            Association::HasOne(a) => &a.lookup,
            Association::HasMany(a) => &a.lookup,
        }
    }

    /// Builds the local rows implied by `remote` for this association.
    pub fn build(
        &self,
        ctx: &BuildContext<'_>,
        owner: Owner<'_>,
        remote: &RemoteRecord,
    ) -> SyncResult<BuildOutcome> {
        match self {
            Association::BelongsTo(a) => a.build(ctx, owner, remote),
            Association::HasOne(a) => a.build(ctx, owner, remote),
            Association::HasMany(a) => a.build(ctx, owner, remote),
        }
    }
}

impl From<BelongsTo> for Association {
    fn from(value: BelongsTo) -> Self {
        Association::BelongsTo(value)
    }
}

impl From<HasOne> for Association {
    fn from(value: HasOne) -> Self {
        Association::HasOne(value)
    }
}

impl From<HasMany> for Association {
    fn from(value: HasMany) -> Self {
        Association::HasMany(value)
    }
}

/// Registry and stores an association build reads from.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    /// Mappings by local entity type.
    pub registry: &'a Registry,
    /// Local store adapter.
    pub local: &'a dyn LocalStore,
    /// Remote store adapter.
    pub remote: &'a dyn RemoteStore,
}

impl<'a> BuildContext<'a> {
    /// Creates a context.
    pub fn new(
        registry: &'a Registry,
        local: &'a dyn LocalStore,
        remote: &'a dyn RemoteStore,
    ) -> Self {
        Self {
            registry,
            local,
            remote,
        }
    }
}

/// The local row an association is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner<'a> {
    /// Local entity type of the owner.
    pub entity: &'a str,
    /// The owner row, if it exists in a persisted or pending form.
    pub row: Option<RowRef>,
}

impl<'a> Owner<'a> {
    /// An owner that has not been written anywhere yet.
    pub fn unsaved(entity: &'a str) -> Self {
        Self { entity, row: None }
    }

    /// A persisted owner.
    pub fn saved(entity: &'a str, id: RowId) -> Self {
        Self {
            entity,
            row: Some(RowRef::Saved(id)),
        }
    }

    pub(crate) fn pending(entity: &'a str, index: usize) -> Self {
        Self {
            entity,
            row: Some(RowRef::Pending(index)),
        }
    }

    /// Owner for a local row, persisted or not.
    pub fn of(row: &'a LocalRow) -> Self {
        Self {
            entity: row.entity(),
            row: row.id().map(RowRef::Saved),
        }
    }
}

/// Result of an association build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Rows to persist, in order. Never empty.
    Built(Vec<LocalRow>),
    /// The remote record implies no rows for this association.
    Empty,
    /// A remote lookup pointed at a record that does not exist. Nothing
    /// should be created for this record in this cycle.
    Unresolved,
}

impl BuildOutcome {
    fn from_graph(graph: Graph) -> Self {
        if graph.is_empty() {
            BuildOutcome::Empty
        } else {
            BuildOutcome::Built(graph.into_rows())
        }
    }

    /// Returns true for [`BuildOutcome::Unresolved`].
    pub fn is_unresolved(&self) -> bool {
        matches!(self, BuildOutcome::Unresolved)
    }

    /// The built rows, empty unless [`BuildOutcome::Built`].
    pub fn rows(&self) -> &[LocalRow] {
        match self {
            BuildOutcome::Built(rows) => rows,
            BuildOutcome::Empty | BuildOutcome::Unresolved => &[],
        }
    }

    /// The primary row.
    pub fn primary(&self) -> Option<&LocalRow> {
        self.rows().first()
    }

    /// Consumes the outcome, returning the built rows.
    pub fn into_rows(self) -> Vec<LocalRow> {
        match self {
            BuildOutcome::Built(rows) => rows,
            BuildOutcome::Empty | BuildOutcome::Unresolved => Vec::new(),
        }
    }
}
