//! Creation of local rows for remote records not yet present locally.

use crate::association::{
    build_with_children, persist_graph, Association, BuildContext, BuildOutcome, Owner,
};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::mapping::Mapping;
use crate::record::{Attributes, LocalRow, RecordKind, RemoteRecord, RowId, RowRef, Scope};
use crate::report::PassReport;
use crate::store::LocalStore;
use crate::value::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Creates a local row, with its parents and children, for every remote
/// record of a mapping that has no local row yet.
///
/// Parents are resolved before anything is written. A record with a lookup
/// that does not resolve is skipped and picked up again by a later pass.
pub struct Initializer<'a> {
    ctx: BuildContext<'a>,
    mapping: Arc<Mapping>,
    config: SyncConfig,
}

enum Initialized {
    Created,
    Present,
    Unresolved,
}

impl<'a> Initializer<'a> {
    /// Creates an initializer for one mapping.
    pub fn new(ctx: BuildContext<'a>, mapping: Arc<Mapping>) -> Self {
        Self {
            ctx,
            mapping,
            config: SyncConfig::default(),
        }
    }

    /// Sets the pass configuration.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs one initialization pass.
    pub fn run(&self) -> SyncResult<PassReport> {
        let mapping = &self.mapping;
        if !mapping.strategy().creates_rows() {
            debug!(
                entity = mapping.entity(),
                remote_type = mapping.remote_type(),
                "passive mapping, not initializing"
            );
            return Ok(PassReport::passive());
        }

        let start = Instant::now();
        let mut report = PassReport::default();
        let records = self
            .ctx
            .remote
            .query(mapping.remote_type(), &mapping.conditions())?;

        for (processed, record) in records.iter().enumerate() {
            if self.config.limit_reached(processed) {
                break;
            }
            match self.initialize(record, &mut report) {
                Ok(Initialized::Created) => {}
                Ok(Initialized::Present) => report.unchanged += 1,
                Ok(Initialized::Unresolved) => report.skipped.push(record.id.clone()),
                Err(error) if self.config.continue_on_error => report.fail(&record.id, error),
                Err(error) => return Err(error),
            }
        }

        report.duration = start.elapsed();
        info!(
            entity = mapping.entity(),
            remote_type = mapping.remote_type(),
            created = report.created.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "initialization pass complete"
        );
        Ok(report)
    }

    fn initialize(&self, record: &RemoteRecord, report: &mut PassReport) -> SyncResult<Initialized> {
        let mapping = &self.mapping;
        let entity = mapping.entity();
        let scope = Scope::entity(entity);
        let lookups = Attributes::from([(
            mapping.lookup_column().to_string(),
            Value::from(record.id.as_str()),
        )]);

        if self.ctx.local.find_by(&scope, &lookups)?.is_some() {
            return Ok(Initialized::Present);
        }

        let mut parents = Vec::new();
        for association in mapping.associations() {
            if let Association::BelongsTo(belongs_to) = association {
                match belongs_to.build(&self.ctx, Owner::unsaved(entity), record)? {
                    BuildOutcome::Unresolved => {
                        debug!(
                            entity,
                            remote_id = %record.id,
                            association = belongs_to.name(),
                            "parent does not resolve, skipping"
                        );
                        return Ok(Initialized::Unresolved);
                    }
                    BuildOutcome::Empty => {}
                    BuildOutcome::Built(rows) => parents.push((belongs_to.name(), rows)),
                }
            }
        }

        let mut row = self.ctx.local.build(&scope, lookups);
        row.assign(&mapping.attributes(RecordKind::Remote, &record.fields));
        let Some((mut row, children)) = build_with_children(&self.ctx, mapping, row, record)?
        else {
            debug!(entity, remote_id = %record.id, "child lookup does not resolve, skipping");
            return Ok(Initialized::Unresolved);
        };

        let mut written = Written::default();
        for (name, rows) in parents {
            let ids = written.persist(self.ctx.local, rows)?;
            if let Some(&parent) = ids.first() {
                row.set_link(name, RowRef::Saved(parent));
            }
        }

        let id = match self.ctx.local.insert(&row) {
            Ok(id) => id,
            Err(SyncError::Conflict { .. }) => {
                debug!(entity, remote_id = %record.id, "row created concurrently");
                return Ok(Initialized::Present);
            }
            Err(error) => return Err(error),
        };
        debug!(entity, %id, remote_id = %record.id, "created row");
        written.created.push(id);

        // Children point at the row as its build index 0.
        row.set_id(id);
        let mut rows = Vec::with_capacity(children.len() + 1);
        rows.push(row);
        rows.extend(children);
        written.persist(self.ctx.local, rows)?;

        written.commit(id, report);
        Ok(Initialized::Created)
    }
}

/// Rows written for one record. They reach the report only once the record
/// is complete, so a record that fails half way is reported as a failure
/// alone.
#[derive(Default)]
struct Written {
    created: Vec<RowId>,
    updated: Vec<RowId>,
}

impl Written {
    fn persist(&mut self, store: &dyn LocalStore, rows: Vec<LocalRow>) -> SyncResult<Vec<RowId>> {
        let fresh: Vec<bool> = rows.iter().map(|row| !row.is_persisted()).collect();
        let ids = persist_graph(store, rows)?;
        for (id, fresh) in ids.iter().zip(fresh) {
            if fresh {
                self.created.push(*id);
            } else if !self.updated.contains(id) {
                self.updated.push(*id);
            }
        }
        Ok(ids)
    }

    fn commit(self, primary: RowId, report: &mut PassReport) {
        report.created.extend(self.created);
        report
            .updated
            .extend(self.updated.into_iter().filter(|id| *id != primary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::{BelongsTo, HasMany};
    use crate::memory::{MemoryLocalStore, MemoryRemoteStore};
    use crate::registry::Registry;
    use crate::schema::EntitySchema;

    struct Fixture {
        registry: Registry,
        local: MemoryLocalStore,
        remote: MemoryRemoteStore,
        objects: Arc<Mapping>,
    }

    fn fixture() -> Fixture {
        let users = EntitySchema::new("users")
            .column("name")
            .unique_column("remote_id");
        let objects = EntitySchema::new("custom_objects")
            .column("name")
            .unique_column("remote_id");
        let notes = EntitySchema::new("notes")
            .column("body")
            .unique_column("remote_id");

        let registry = Registry::new();
        registry.register(
            Mapping::builder(users.clone(), "Contact")
                .field("name", "Name")
                .build()
                .unwrap(),
        ).unwrap();
        let mapping = registry.register(
            Mapping::builder(objects.clone(), "CustomObject__c")
                .field("name", "Name")
                .association(BelongsTo::new("user", "users", "Friend__c"))
                .association(HasMany::new("notes", "notes", "object", "Object__c"))
                .build()
                .unwrap(),
        ).unwrap();
        registry.register(
            Mapping::builder(notes.clone(), "Note__c")
                .field("body", "Body__c")
                .build()
                .unwrap(),
        ).unwrap();

        let local = MemoryLocalStore::new()
            .with_entity(users)
            .with_entity(objects)
            .with_entity(notes);
        let remote = MemoryRemoteStore::new();
        remote.insert(RemoteRecord::new("Contact", "003").with_field("Name", "Ann"));
        remote.insert(
            RemoteRecord::new("CustomObject__c", "a001")
                .with_field("Name", "Scarborough Fair")
                .with_field("Friend__c", "003"),
        );
        remote.insert(
            RemoteRecord::new("Note__c", "n01")
                .with_field("Body__c", "parsley")
                .with_field("Object__c", "a001"),
        );

        Fixture {
            registry,
            local,
            remote,
            objects: mapping,
        }
    }

    impl Fixture {
        fn initializer(&self) -> Initializer<'_> {
            let ctx = BuildContext::new(&self.registry, &self.local, &self.remote);
            Initializer::new(ctx, Arc::clone(&self.objects))
        }
    }

    #[test]
    fn creates_row_with_parent_and_children() {
        let fx = fixture();
        let report = fx.initializer().run().unwrap();

        assert!(report.is_success());
        assert_eq!(report.created.len(), 3);
        assert_eq!(fx.local.count("users"), 1);
        assert_eq!(fx.local.count("custom_objects"), 1);
        assert_eq!(fx.local.count("notes"), 1);

        let object = fx.local.rows("custom_objects").unwrap().remove(0);
        let user = fx.local.rows("users").unwrap().remove(0);
        assert_eq!(object.link("user"), user.id().map(RowRef::Saved));
        assert_eq!(object.get("name"), Some(&Value::from("Scarborough Fair")));

        let note = fx.local.rows("notes").unwrap().remove(0);
        assert_eq!(note.link("object"), object.id().map(RowRef::Saved));
    }

    #[test]
    fn second_pass_creates_nothing() {
        let fx = fixture();
        fx.initializer().run().unwrap();
        let report = fx.initializer().run().unwrap();

        assert!(report.created.is_empty());
        assert_eq!(report.unchanged, 1);
        assert_eq!(fx.local.count("custom_objects"), 1);
    }

    #[test]
    fn unresolved_parent_skips_record() {
        let fx = fixture();
        fx.remote.remove("Contact", "003");

        let report = fx.initializer().run().unwrap();
        assert_eq!(report.skipped, ["a001"]);
        assert_eq!(fx.local.count("custom_objects"), 0);
        assert_eq!(fx.local.count("users"), 0);
    }

    #[test]
    fn local_failure_is_reported() {
        let fx = fixture();
        fx.local.set_reject_writes(true);

        let report = fx.initializer().run().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, "a001");
        assert!(matches!(report.failures[0].error, SyncError::Local(_)));
    }

    #[test]
    fn failed_child_write_is_reported_without_the_create() {
        let fx = fixture();
        // No `notes` table, so the child write fails after the row is in.
        let local = MemoryLocalStore::new()
            .with_entity(fx.local.schema("users").unwrap())
            .with_entity(fx.local.schema("custom_objects").unwrap());
        let ctx = BuildContext::new(&fx.registry, &local, &fx.remote);

        let report = Initializer::new(ctx, Arc::clone(&fx.objects)).run().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, SyncError::UnknownEntity(_)));
        assert!(report.created.is_empty());
        assert!(report.updated.is_empty());
    }

    #[test]
    fn dangling_child_lookup_writes_nothing() {
        let fx = fixture();
        let registry = Registry::new();
        registry
            .register(
                Mapping::builder(fx.local.schema("users").unwrap(), "Contact")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                Mapping::builder(fx.local.schema("notes").unwrap(), "Note__c")
                    .field("body", "Body__c")
                    .association(BelongsTo::new("author", "users", "Author__c"))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        fx.remote.set_field("Note__c", "n01", "Author__c", "missing");
        let ctx = BuildContext::new(&registry, &fx.local, &fx.remote);

        let report = Initializer::new(ctx, Arc::clone(&fx.objects)).run().unwrap();
        assert_eq!(report.skipped, ["a001"]);
        assert_eq!(fx.local.count("users"), 0);
        assert_eq!(fx.local.count("custom_objects"), 0);
        assert_eq!(fx.local.count("notes"), 0);
    }

    #[test]
    fn passive_mapping_creates_nothing() {
        let fx = fixture();
        let passive = Arc::new(
            Mapping::builder(fx.objects.schema().clone(), "CustomObject__c")
                .through("Friend__c")
                .build()
                .unwrap(),
        );
        let ctx = BuildContext::new(&fx.registry, &fx.local, &fx.remote);

        let report = Initializer::new(ctx, passive).run().unwrap();
        assert!(report.passive);
        assert_eq!(fx.local.count("custom_objects"), 0);
    }
}
