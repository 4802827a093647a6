//! In-memory local store.

use crate::error::{SyncError, SyncResult};
use crate::record::{Attributes, LocalRow, RowId, RowRef, Scope};
use crate::schema::EntitySchema;
use crate::store::LocalStore;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A local store keeping rows in memory.
///
/// Entity types must be declared up front with [`MemoryLocalStore::with_entity`].
/// Columns declared unique are enforced on insert and update, which is what
/// lets concurrent association builds detect a lost find-or-create race.
#[derive(Debug)]
pub struct MemoryLocalStore {
    schemas: HashMap<String, EntitySchema>,
    tables: RwLock<HashMap<String, BTreeMap<RowId, LocalRow>>>,
    next_id: AtomicU64,
    reject_writes: AtomicBool,
}

impl MemoryLocalStore {
    /// Creates an empty store with no entity types.
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
            tables: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            reject_writes: AtomicBool::new(false),
        }
    }

    /// Declares an entity type.
    #[must_use]
    pub fn with_entity(mut self, schema: EntitySchema) -> Self {
        self.tables
            .get_mut()
            .insert(schema.name().to_string(), BTreeMap::new());
        self.schemas.insert(schema.name().to_string(), schema);
        self
    }

    /// Makes every subsequent write fail, as a rejecting database would.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Returns a row by id.
    pub fn get(&self, entity: &str, id: RowId) -> Option<LocalRow> {
        self.tables.read().get(entity)?.get(&id).cloned()
    }

    /// Number of rows of an entity type.
    pub fn count(&self, entity: &str) -> usize {
        self.tables.read().get(entity).map_or(0, BTreeMap::len)
    }

    fn schema_for(&self, entity: &str) -> SyncResult<&EntitySchema> {
        self.schemas
            .get(entity)
            .ok_or_else(|| SyncError::UnknownEntity(entity.to_string()))
    }

    fn check_writable(&self) -> SyncResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            Err(SyncError::Local("writes rejected".into()))
        } else {
            Ok(())
        }
    }

    fn validate(&self, row: &LocalRow) -> SyncResult<&EntitySchema> {
        let schema = self.schema_for(row.entity())?;
        if let Some(column) = row.fields().keys().find(|c| !schema.has_column(c)) {
            return Err(SyncError::Local(format!(
                "{} has no column `{column}`",
                row.entity()
            )));
        }
        if let Some((name, _)) = row
            .links()
            .iter()
            .find(|(_, link)| matches!(link, RowRef::Pending(_)))
        {
            return Err(SyncError::Local(format!(
                "link `{name}` of {} row points at an unsaved row",
                row.entity()
            )));
        }
        Ok(schema)
    }
}

impl Default for MemoryLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks the unique columns of `row` against every other row of its table.
fn check_unique(
    schema: &EntitySchema,
    table: &BTreeMap<RowId, LocalRow>,
    fields: &Attributes,
    except: Option<RowId>,
) -> SyncResult<()> {
    for column in schema.unique_columns() {
        let Some(value) = fields.get(column).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = table
            .iter()
            .any(|(id, other)| Some(*id) != except && other.fields().get(column) == Some(value));
        if taken {
            return Err(SyncError::Conflict {
                entity: schema.name().to_string(),
                column: column.to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

impl LocalStore for MemoryLocalStore {
    fn schema(&self, entity: &str) -> Option<EntitySchema> {
        self.schemas.get(entity).cloned()
    }

    fn rows(&self, entity: &str) -> SyncResult<Vec<LocalRow>> {
        self.schema_for(entity)?;
        Ok(self
            .tables
            .read()
            .get(entity)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    fn find_by(&self, scope: &Scope, lookups: &Attributes) -> SyncResult<Option<LocalRow>> {
        self.schema_for(&scope.entity)?;
        Ok(self.tables.read().get(&scope.entity).and_then(|table| {
            table
                .values()
                .find(|row| row.matches(scope, lookups))
                .cloned()
        }))
    }

    fn insert(&self, row: &LocalRow) -> SyncResult<RowId> {
        self.check_writable()?;
        if row.is_persisted() {
            return Err(SyncError::Local(format!(
                "{} row is already persisted",
                row.entity()
            )));
        }
        let schema = self.validate(row)?;

        let mut tables = self.tables.write();
        let table = tables.entry(row.entity().to_string()).or_default();
        check_unique(schema, table, row.fields(), None)?;

        let id = RowId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut stored = row.clone();
        stored.set_id(id);
        table.insert(id, stored);
        Ok(id)
    }

    fn update(&self, row: &LocalRow) -> SyncResult<()> {
        self.check_writable()?;
        let schema = self.validate(row)?;
        let not_found = || SyncError::NotFound {
            entity: row.entity().to_string(),
            id: row.id().map_or(0, RowId::get),
        };
        let id = row.id().ok_or_else(not_found)?;

        let mut tables = self.tables.write();
        let table = tables.entry(row.entity().to_string()).or_default();
        let mut merged = table.get(&id).cloned().ok_or_else(not_found)?;
        merged.assign(row.fields());
        for (name, link) in row.links() {
            merged.set_link(name.clone(), *link);
        }
        check_unique(schema, table, merged.fields(), Some(id))?;
        table.insert(id, merged);
        Ok(())
    }

    fn delete(&self, entity: &str, id: RowId) -> SyncResult<bool> {
        self.check_writable()?;
        self.schema_for(entity)?;
        Ok(self
            .tables
            .write()
            .get_mut(entity)
            .and_then(|table| table.remove(&id))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn store() -> MemoryLocalStore {
        MemoryLocalStore::new()
            .with_entity(EntitySchema::new("users").column("name").unique_column("remote_id"))
            .with_entity(EntitySchema::new("details").column("body").unique_column("remote_id"))
    }

    fn lookups(id: &str) -> Attributes {
        Attributes::from([("remote_id".to_string(), Value::from(id))])
    }

    #[test]
    fn insert_and_find() {
        let store = store();
        let row = LocalRow::new("users").with_field("remote_id", "003").with_field("name", "Ann");
        let id = store.insert(&row).unwrap();

        let found = store
            .find_by(&Scope::entity("users"), &lookups("003"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), Some(id));
        assert_eq!(found.get("name"), Some(&Value::from("Ann")));
        assert_eq!(store.count("users"), 1);
    }

    #[test]
    fn unique_lookup_conflicts() {
        let store = store();
        let row = LocalRow::new("users").with_field("remote_id", "003");
        store.insert(&row).unwrap();

        let err = store.insert(&row).unwrap_err();
        assert!(matches!(err, SyncError::Conflict { ref column, .. } if column == "remote_id"));
    }

    #[test]
    fn update_merges_fields() {
        let store = store();
        let id = store
            .insert(&LocalRow::new("users").with_field("remote_id", "003").with_field("name", "Ann"))
            .unwrap();

        let mut row = LocalRow::new("users").with_field("name", "Bea");
        row.set_id(id);
        store.update(&row).unwrap();

        let stored = store.get("users", id).unwrap();
        assert_eq!(stored.get("name"), Some(&Value::from("Bea")));
        assert_eq!(stored.get("remote_id"), Some(&Value::from("003")));
    }

    #[test]
    fn update_missing_row() {
        let store = store();
        let mut row = LocalRow::new("users");
        row.set_id(RowId::new(99));
        assert!(matches!(store.update(&row), Err(SyncError::NotFound { id: 99, .. })));
    }

    #[test]
    fn rejects_pending_links_and_unknown_columns() {
        let store = store();
        let mut row = LocalRow::new("details").with_field("remote_id", "a01");
        row.set_link("user", RowRef::Pending(0));
        assert!(store.insert(&row).is_err());

        let row = LocalRow::new("details").with_field("color", "red");
        assert!(store.insert(&row).is_err());

        let row = LocalRow::new("ghosts");
        assert!(matches!(store.insert(&row), Err(SyncError::UnknownEntity(_))));
    }

    #[test]
    fn delete_reports_presence() {
        let store = store();
        let id = store.insert(&LocalRow::new("users")).unwrap();
        assert!(store.delete("users", id).unwrap());
        assert!(!store.delete("users", id).unwrap());
    }

    #[test]
    fn rejected_writes() {
        let store = store();
        store.set_reject_writes(true);
        assert!(matches!(
            store.insert(&LocalRow::new("users")),
            Err(SyncError::Local(_))
        ));
    }
}
