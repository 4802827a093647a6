//! Local and remote record representations.
//!
//! Both sides of a reconciliation carry their data in an [`Attributes`]
//! container. Which naming scheme the keys follow is decided by the
//! [`RecordKind`]: local rows are keyed by column name, remote records by
//! remote field name.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered field name to value container.
pub type Attributes = BTreeMap<String, Value>;

/// Which store a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A row in the local relational store.
    Local,
    /// A record in the remote object store.
    Remote,
}

/// Identifier of a persisted local row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(u64);

impl RowId {
    /// Creates a row id from its raw value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A foreign key from one local row to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowRef {
    /// The referenced row is already persisted.
    Saved(RowId),
    /// The referenced row is the element at this index of the build
    /// sequence being assembled and is not persisted yet.
    Pending(usize),
}

impl RowRef {
    /// Returns the row id if the referenced row is persisted.
    pub fn saved(self) -> Option<RowId> {
        match self {
            RowRef::Saved(id) => Some(id),
            RowRef::Pending(_) => None,
        }
    }
}

/// Link from a scoped child row back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    /// Name of the link on the child row.
    pub link: String,
    /// The owner row.
    pub row: RowRef,
}

/// The set of local rows an association operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Local entity type.
    pub entity: String,
    /// Owner the rows must link to, if any.
    pub parent: Option<ParentLink>,
}

impl Scope {
    /// All rows of an entity type.
    pub fn entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            parent: None,
        }
    }

    /// Rows of an entity type linking to `row` through `link`.
    pub fn owned_by(entity: impl Into<String>, link: impl Into<String>, row: RowRef) -> Self {
        Self {
            entity: entity.into(),
            parent: Some(ParentLink {
                link: link.into(),
                row,
            }),
        }
    }
}

/// A row of the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRow {
    id: Option<RowId>,
    entity: String,
    fields: Attributes,
    links: BTreeMap<String, RowRef>,
}

impl LocalRow {
    /// Creates a new unsaved row.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            id: None,
            entity: entity.into(),
            fields: Attributes::new(),
            links: BTreeMap::new(),
        }
    }

    /// Creates a new unsaved row inside `scope`, seeded with `lookups`.
    pub fn scoped(scope: &Scope, lookups: Attributes) -> Self {
        let mut row = Self::new(scope.entity.clone());
        row.fields = lookups;
        if let Some(parent) = &scope.parent {
            row.links.insert(parent.link.clone(), parent.row);
        }
        row
    }

    /// Sets the field values.
    #[must_use]
    pub fn with_fields(mut self, fields: Attributes) -> Self {
        self.fields = fields;
        self
    }

    /// Sets one field value.
    #[must_use]
    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Returns the row id, if persisted.
    pub fn id(&self) -> Option<RowId> {
        self.id
    }

    /// Marks the row as persisted under `id`.
    pub fn set_id(&mut self, id: RowId) {
        self.id = Some(id);
    }

    /// Returns true if the row has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Local entity type.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Column values.
    pub fn fields(&self) -> &Attributes {
        &self.fields
    }

    /// Returns a column value, treating null as absent.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column).filter(|v| !v.is_null())
    }

    /// Sets a column value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Merges `attributes` over the current column values.
    pub fn assign(&mut self, attributes: &Attributes) {
        for (column, value) in attributes {
            self.fields.insert(column.clone(), value.clone());
        }
    }

    /// Foreign keys by association name.
    pub fn links(&self) -> &BTreeMap<String, RowRef> {
        &self.links
    }

    /// Returns the foreign key for an association.
    pub fn link(&self, name: &str) -> Option<RowRef> {
        self.links.get(name).copied()
    }

    /// Sets the foreign key for an association.
    pub fn set_link(&mut self, name: impl Into<String>, row: RowRef) {
        self.links.insert(name.into(), row);
    }

    /// Mutable access to every link.
    pub(crate) fn links_mut(&mut self) -> impl Iterator<Item = (&String, &mut RowRef)> {
        self.links.iter_mut()
    }

    /// Drops the foreign key for an association.
    pub(crate) fn remove_link(&mut self, name: &str) -> Option<RowRef> {
        self.links.remove(name)
    }

    /// Returns true if the row lies in `scope` and carries every lookup value.
    pub fn matches(&self, scope: &Scope, lookups: &Attributes) -> bool {
        if self.entity != scope.entity {
            return false;
        }
        if let Some(parent) = &scope.parent {
            if self.links.get(&parent.link) != Some(&parent.row) {
                return false;
            }
        }
        lookups
            .iter()
            .all(|(column, value)| self.fields.get(column) == Some(value))
    }
}

/// A record of the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Remote identifier.
    pub id: String,
    /// Remote entity type.
    pub object_type: String,
    /// Field values keyed by remote field name.
    #[serde(default)]
    pub fields: Attributes,
}

impl RemoteRecord {
    /// Creates a remote record without fields.
    pub fn new(object_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object_type: object_type.into(),
            fields: Attributes::new(),
        }
    }

    /// Sets one field value.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Returns a field value, treating null as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookups(column: &str, id: &str) -> Attributes {
        Attributes::from([(column.to_string(), Value::from(id))])
    }

    #[test]
    fn scoped_row_carries_parent_link() {
        let scope = Scope::owned_by("comments", "post", RowRef::Saved(RowId::new(3)));
        let row = LocalRow::scoped(&scope, lookups("remote_id", "a01"));

        assert!(!row.is_persisted());
        assert_eq!(row.link("post"), Some(RowRef::Saved(RowId::new(3))));
        assert_eq!(row.get("remote_id"), Some(&Value::from("a01")));
        assert!(row.matches(&scope, &lookups("remote_id", "a01")));
    }

    #[test]
    fn matches_respects_scope() {
        let row = LocalRow::new("comments")
            .with_field("remote_id", "a01")
            .with_field("body", "hi");

        assert!(row.matches(&Scope::entity("comments"), &lookups("remote_id", "a01")));
        assert!(!row.matches(&Scope::entity("posts"), &lookups("remote_id", "a01")));
        assert!(!row.matches(&Scope::entity("comments"), &lookups("remote_id", "a02")));

        let owned = Scope::owned_by("comments", "post", RowRef::Saved(RowId::new(1)));
        assert!(!row.matches(&owned, &Attributes::new()));
    }

    #[test]
    fn null_reads_as_absent() {
        let row = LocalRow::new("users").with_field("remote_id", Value::Null);
        assert!(row.get("remote_id").is_none());

        let record = RemoteRecord::new("Contact", "003").with_field("AccountId", Value::Null);
        assert!(record.get("AccountId").is_none());
    }

    #[test]
    fn assign_merges() {
        let mut row = LocalRow::new("users").with_field("name", "a").with_field("age", 3);
        row.assign(&Attributes::from([("name".to_string(), Value::from("b"))]));
        assert_eq!(row.get("name"), Some(&Value::from("b")));
        assert_eq!(row.get("age"), Some(&Value::from(3)));
    }
}
