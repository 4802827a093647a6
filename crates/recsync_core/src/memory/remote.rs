//! In-memory remote store.

use super::predicate::Predicate;
use crate::error::{SyncError, SyncResult};
use crate::record::{Attributes, RemoteRecord};
use crate::store::RemoteStore;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A remote store keeping records in memory.
///
/// Queries evaluate condition strings with a small predicate language
/// (`Field = 'v'`, `Field != 'v'`, joined with `AND`). The store can be
/// switched offline to simulate transient failures.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    objects: RwLock<HashMap<String, BTreeMap<String, RemoteRecord>>>,
    offline: AtomicBool,
    requests: AtomicU64,
}

impl MemoryRemoteStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record.
    pub fn insert(&self, record: RemoteRecord) {
        self.objects
            .write()
            .entry(record.object_type.clone())
            .or_default()
            .insert(record.id.clone(), record);
    }

    /// Removes a record. Returns false if it did not exist.
    pub fn remove(&self, object_type: &str, id: &str) -> bool {
        self.objects
            .write()
            .get_mut(object_type)
            .and_then(|records| records.remove(id))
            .is_some()
    }

    /// Sets one field of a stored record. Returns false if it does not exist.
    pub fn set_field(
        &self,
        object_type: &str,
        id: &str,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> bool {
        match self
            .objects
            .write()
            .get_mut(object_type)
            .and_then(|records| records.get_mut(id))
        {
            Some(record) => {
                record.fields.insert(field.into(), value.into());
                true
            }
            None => false,
        }
    }

    /// Returns a stored record without counting a request.
    pub fn get(&self, object_type: &str, id: &str) -> Option<RemoteRecord> {
        self.objects.read().get(object_type)?.get(id).cloned()
    }

    /// Makes every request fail with a retryable error while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests served or refused so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    fn begin_request(&self) -> SyncResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            Err(SyncError::remote_retryable("remote store unavailable"))
        } else {
            Ok(())
        }
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn find(&self, object_type: &str, id: &str) -> SyncResult<Option<RemoteRecord>> {
        self.begin_request()?;
        Ok(self.get(object_type, id))
    }

    fn query(&self, object_type: &str, conditions: &[String]) -> SyncResult<Vec<RemoteRecord>> {
        self.begin_request()?;
        let predicates = conditions
            .iter()
            .map(|c| Predicate::parse(c))
            .collect::<SyncResult<Vec<_>>>()?;

        Ok(self
            .objects
            .read()
            .get(object_type)
            .map(|records| {
                records
                    .values()
                    .filter(|record| predicates.iter().all(|p| p.matches(record)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn update(&self, object_type: &str, id: &str, attributes: &Attributes) -> SyncResult<()> {
        self.begin_request()?;
        let mut objects = self.objects.write();
        let record = objects
            .get_mut(object_type)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| SyncError::remote_fatal(format!("{object_type} {id} does not exist")))?;
        for (field, value) in attributes {
            record.fields.insert(field.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryRemoteStore {
        let store = MemoryRemoteStore::new();
        store.insert(RemoteRecord::new("Contact", "003A").with_field("Name", "Ann"));
        store.insert(RemoteRecord::new("Contact", "003B").with_field("Name", "Bea"));
        store
    }

    #[test]
    fn find_by_id() {
        let store = store();
        assert_eq!(store.find("Contact", "003A").unwrap().unwrap().id, "003A");
        assert!(store.find("Contact", "003Z").unwrap().is_none());
        assert!(store.find("Account", "003A").unwrap().is_none());
    }

    #[test]
    fn query_applies_every_condition() {
        let store = store();
        let all = store.query("Contact", &[]).unwrap();
        assert_eq!(all.len(), 2);

        let conditions = vec!["Name != 'Ann'".to_string()];
        let found = store.query("Contact", &conditions).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "003B");

        let conditions = vec!["Id = '003B'".to_string(), "Name = 'Ann'".to_string()];
        assert!(store.query("Contact", &conditions).unwrap().is_empty());
    }

    #[test]
    fn malformed_condition_is_an_error() {
        let conditions = vec!["Name ~ 'Ann'".to_string()];
        assert!(matches!(
            store().query("Contact", &conditions),
            Err(SyncError::InvalidCondition(_))
        ));
    }

    #[test]
    fn offline_errors_are_retryable() {
        let store = store();
        store.set_offline(true);
        let err = store.find("Contact", "003A").unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.request_count(), 1);
    }

    #[test]
    fn update_writes_fields() {
        let store = store();
        let attrs = Attributes::from([("Name".to_string(), Value::from("Cid"))]);
        store.update("Contact", "003A", &attrs).unwrap();
        assert_eq!(
            store.get("Contact", "003A").unwrap().get("Name"),
            Some(&Value::from("Cid"))
        );
        assert!(store.update("Contact", "003Z", &attrs).is_err());
    }
}
