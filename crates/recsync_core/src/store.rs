//! Store adapter abstractions.
//!
//! The core never talks to a database or an API directly. Drivers supply a
//! [`LocalStore`] and a [`RemoteStore`]; the in-memory implementations in
//! [`crate::memory`] are used for tests and embedding.

use crate::error::SyncResult;
use crate::record::{Attributes, LocalRow, RemoteRecord, RowId, Scope};
use crate::schema::EntitySchema;

/// Name of the identifier field in remote condition predicates.
pub const REMOTE_ID_FIELD: &str = "Id";

/// Adapter over the local relational store.
pub trait LocalStore: Send + Sync {
    /// Describes an entity type, if the store knows it.
    fn schema(&self, entity: &str) -> Option<EntitySchema>;

    /// Returns every row of an entity type.
    fn rows(&self, entity: &str) -> SyncResult<Vec<LocalRow>>;

    /// Finds the first row inside `scope` carrying every lookup value.
    fn find_by(&self, scope: &Scope, lookups: &Attributes) -> SyncResult<Option<LocalRow>>;

    /// Builds an unsaved row inside `scope`.
    fn build(&self, scope: &Scope, lookups: Attributes) -> LocalRow {
        LocalRow::scoped(scope, lookups)
    }

    /// Inserts an unsaved row whose links are all persisted.
    fn insert(&self, row: &LocalRow) -> SyncResult<RowId>;

    /// Writes the fields and links of a persisted row.
    fn update(&self, row: &LocalRow) -> SyncResult<()>;

    /// Deletes a row. Returns false if it did not exist.
    fn delete(&self, entity: &str, id: RowId) -> SyncResult<bool>;
}

/// Adapter over the remote object store.
pub trait RemoteStore: Send + Sync {
    /// Finds a record by id.
    fn find(&self, object_type: &str, id: &str) -> SyncResult<Option<RemoteRecord>>;

    /// Returns the records of a type satisfying every condition.
    fn query(&self, object_type: &str, conditions: &[String]) -> SyncResult<Vec<RemoteRecord>>;

    /// Writes fields, keyed by remote field name, onto a record.
    fn update(&self, object_type: &str, id: &str, attributes: &Attributes) -> SyncResult<()>;
}

/// Builds an equality predicate against a remote field.
pub fn eq_condition(field: &str, value: &str) -> String {
    format!("{field} = '{}'", escape(value))
}

/// Builds the predicate selecting a remote record by id.
pub fn id_condition(id: &str) -> String {
    eq_condition(REMOTE_ID_FIELD, id)
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}
