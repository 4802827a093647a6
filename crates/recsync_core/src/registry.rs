//! Index of mappings by local entity type.

use crate::error::{SyncError, SyncResult};
use crate::mapping::Mapping;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Index from local entity type to the mappings that target it.
///
/// Several mappings may target the same entity type; they compose rather
/// than override, and lookups return them in registration order. The
/// registry is an explicit value owned by the driver: populate it at
/// startup and [`clear`](Registry::clear) it between independent runs.
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_entity: HashMap<String, Vec<Arc<Mapping>>>,
    ordered: Vec<Arc<Mapping>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mapping and returns the shared handle to it.
    ///
    /// Mappings of one entity type for different remote types must use
    /// different lookup columns. Otherwise the remote ids of both types land
    /// in the same column and each mapping's cleaner would delete the other's
    /// rows. Such a mapping is rejected with [`SyncError::InvalidMapping`].
    pub fn register(&self, mapping: Mapping) -> SyncResult<Arc<Mapping>> {
        let mut inner = self.inner.write();
        let siblings = inner.by_entity.get(mapping.entity());
        if let Some(other) = siblings.into_iter().flatten().find(|other| {
            other.lookup_column() == mapping.lookup_column()
                && other.remote_type() != mapping.remote_type()
        }) {
            return Err(SyncError::invalid_mapping(
                mapping.entity(),
                format!(
                    "lookup column `{}` is already used by the `{}` mapping",
                    mapping.lookup_column(),
                    other.remote_type()
                ),
            ));
        }

        let mapping = Arc::new(mapping);
        inner
            .by_entity
            .entry(mapping.entity().to_string())
            .or_default()
            .push(Arc::clone(&mapping));
        inner.ordered.push(Arc::clone(&mapping));
        tracing::debug!(
            entity = mapping.entity(),
            remote_type = mapping.remote_type(),
            "registered mapping"
        );
        Ok(mapping)
    }

    /// Mappings targeting `entity`, in registration order.
    pub fn for_entity_type(&self, entity: &str) -> Vec<Arc<Mapping>> {
        self.inner
            .read()
            .by_entity
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Every registered mapping, in registration order.
    pub fn mappings(&self) -> Vec<Arc<Mapping>> {
        self.inner.read().ordered.clone()
    }

    /// Number of registered mappings.
    pub fn len(&self) -> usize {
        self.inner.read().ordered.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every mapping.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_entity.clear();
        inner.ordered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntitySchema;

    fn mapping(entity: &str, remote_type: &str) -> Mapping {
        let schema = EntitySchema::new(entity).unique_column("remote_id");
        Mapping::builder(schema, remote_type).build().unwrap()
    }

    #[test]
    fn mappings_compose_in_registration_order() {
        let users = EntitySchema::new("users")
            .unique_column("contact_remote_id")
            .unique_column("user_remote_id");
        let registry = Registry::new();
        registry
            .register(Mapping::builder(users.clone(), "Contact").build().unwrap())
            .unwrap();
        registry.register(mapping("details", "Detail__c")).unwrap();
        registry
            .register(Mapping::builder(users, "User").build().unwrap())
            .unwrap();

        let users = registry.for_entity_type("users");
        let types: Vec<_> = users.iter().map(|m| m.remote_type()).collect();
        assert_eq!(types, ["Contact", "User"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.mappings()[1].remote_type(), "Detail__c");
    }

    #[test]
    fn shared_lookup_column_across_remote_types_is_rejected() {
        let registry = Registry::new();
        registry.register(mapping("users", "Contact")).unwrap();

        let err = registry.register(mapping("users", "User")).unwrap_err();
        assert!(matches!(err, SyncError::InvalidMapping { ref entity, .. } if entity == "users"));
        assert_eq!(registry.for_entity_type("users").len(), 1);

        // A second mapping of the same remote type may share the column.
        registry.register(mapping("users", "Contact")).unwrap();
        assert_eq!(registry.for_entity_type("users").len(), 2);
    }

    #[test]
    fn unknown_entity_is_empty() {
        let registry = Registry::new();
        assert!(registry.for_entity_type("users").is_empty());
    }

    #[test]
    fn clear_empties_registry() {
        let registry = Registry::new();
        registry.register(mapping("users", "Contact")).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.for_entity_type("users").is_empty());
    }

    #[test]
    fn registered_handle_shares_conditions() {
        let registry = Registry::new();
        let handle = registry.register(mapping("users", "Contact")).unwrap();
        handle.set_conditions(["Name != 'x'"]);
        assert_eq!(
            registry.for_entity_type("users")[0].conditions(),
            ["Name != 'x'"]
        );
    }
}
