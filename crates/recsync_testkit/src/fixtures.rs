//! Test fixtures and store helpers.
//!
//! The scenario mirrors a typical setup: contacts map to `users`, a custom
//! object maps to `custom_objects` and belongs to a user, and each custom
//! object has many `details`.

use recsync_core::{
    BelongsTo, BuildContext, Cleaner, EntitySchema, HasMany, Initializer, Mapping,
    MemoryLocalStore, MemoryRemoteStore, Registry, RemoteRecord, Synchronizer,
};
use std::sync::Arc;

/// Remote type of the custom object.
pub const CUSTOM_OBJECT: &str = "CustomObject__c";

/// Remote type of users.
pub const CONTACT: &str = "Contact";

/// Remote type of details.
pub const DETAIL: &str = "Detail__c";

/// Condition used by the Scarborough Fair scenario.
pub const SCARBOROUGH: &str = "Name = 'Scarborough Fair'";

/// Schema of the `users` table.
pub fn users_schema() -> EntitySchema {
    EntitySchema::new("users")
        .column("name")
        .unique_column("remote_id")
}

/// Schema of the `custom_objects` table.
pub fn custom_objects_schema() -> EntitySchema {
    EntitySchema::new("custom_objects")
        .columns(["name", "example"])
        .unique_column("remote_id")
}

/// Schema of the `details` table.
pub fn details_schema() -> EntitySchema {
    EntitySchema::new("details")
        .column("body")
        .unique_column("remote_id")
}

/// Mapping of custom objects, without conditions.
pub fn custom_object_mapping() -> Mapping {
    Mapping::builder(custom_objects_schema(), CUSTOM_OBJECT)
        .field("name", "Name")
        .field("example", "Example_Field__c")
        .association(BelongsTo::new("user", "users", "Friend__c"))
        .association(HasMany::new("details", "details", "custom_object", "Parent__c"))
        .build()
        .expect("Invalid custom object mapping")
}

/// Builds a remote record from JSON.
///
/// Expects `id`, `object_type` and an optional `fields` object.
pub fn remote_record(value: serde_json::Value) -> RemoteRecord {
    serde_json::from_value(value).expect("Invalid remote record fixture")
}

/// Registry, stores and mappings of the standard scenario.
pub struct Scenario {
    /// Registered mappings.
    pub registry: Registry,
    /// Local store with every scenario table.
    pub local: MemoryLocalStore,
    /// Remote store, initially empty.
    pub remote: MemoryRemoteStore,
    /// Mapping of `users`.
    pub users: Arc<Mapping>,
    /// Mapping of `custom_objects`.
    pub objects: Arc<Mapping>,
    /// Mapping of `details`.
    pub details: Arc<Mapping>,
}

impl Scenario {
    /// Creates the scenario with empty stores.
    pub fn new() -> Self {
        let registry = Registry::new();
        let users = registry.register(
            Mapping::builder(users_schema(), CONTACT)
                .field("name", "Name")
                .build()
                .expect("Invalid user mapping"),
        )
        .expect("Failed to register user mapping");
        let objects = registry
            .register(custom_object_mapping())
            .expect("Failed to register custom object mapping");
        let details = registry.register(
            Mapping::builder(details_schema(), DETAIL)
                .field("body", "Body__c")
                .build()
                .expect("Invalid detail mapping"),
        )
        .expect("Failed to register detail mapping");

        let local = MemoryLocalStore::new()
            .with_entity(users_schema())
            .with_entity(custom_objects_schema())
            .with_entity(details_schema());

        Self {
            registry,
            local,
            remote: MemoryRemoteStore::new(),
            users,
            objects,
            details,
        }
    }

    /// Inserts a remote record given as JSON and returns it.
    pub fn add_remote(&self, value: serde_json::Value) -> RemoteRecord {
        let record = remote_record(value);
        self.remote.insert(record.clone());
        record
    }

    /// Build context over the scenario's registry and stores.
    pub fn ctx(&self) -> BuildContext<'_> {
        BuildContext::new(&self.registry, &self.local, &self.remote)
    }

    /// Initializer for a mapping of the scenario.
    pub fn initializer(&self, mapping: &Arc<Mapping>) -> Initializer<'_> {
        Initializer::new(self.ctx(), Arc::clone(mapping))
    }

    /// Synchronizer for a mapping of the scenario.
    pub fn synchronizer(&self, mapping: &Arc<Mapping>) -> Synchronizer<'_> {
        Synchronizer::new(Arc::clone(mapping), &self.local, &self.remote)
    }

    /// Cleaner for a mapping of the scenario.
    pub fn cleaner(&self, mapping: &Arc<Mapping>) -> Cleaner<'_> {
        Cleaner::new(Arc::clone(mapping), &self.local, &self.remote)
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}
