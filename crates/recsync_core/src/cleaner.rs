//! Removal of local rows whose remote record no longer qualifies.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::mapping::Mapping;
use crate::record::LocalRow;
use crate::report::PassReport;
use crate::store::{id_condition, LocalStore, RemoteStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Deletes the local rows of a mapping whose remote record is gone or no
/// longer satisfies the mapping's conditions.
///
/// A remote failure never deletes anything: the row is kept and the failure
/// is reported. Running the cleaner twice in a row deletes nothing the
/// second time. Passive mappings are never cleaned.
///
/// Every row of the entity with a value in the mapping's lookup column is
/// examined, whichever mapping created it. [`Registry::register`] keeps
/// mappings of different remote types off a shared lookup column.
///
/// [`Registry::register`]: crate::Registry::register
pub struct Cleaner<'a> {
    mapping: Arc<Mapping>,
    local: &'a dyn LocalStore,
    remote: &'a dyn RemoteStore,
    config: SyncConfig,
}

impl<'a> Cleaner<'a> {
    /// Creates a cleaner for one mapping.
    pub fn new(
        mapping: Arc<Mapping>,
        local: &'a dyn LocalStore,
        remote: &'a dyn RemoteStore,
    ) -> Self {
        Self {
            mapping,
            local,
            remote,
            config: SyncConfig::default(),
        }
    }

    /// Sets the pass configuration.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// The mapping being cleaned.
    pub fn mapping(&self) -> &Arc<Mapping> {
        &self.mapping
    }

    /// Runs one cleaning pass.
    ///
    /// Only a failure to list the local rows, or a per-row failure when
    /// `continue_on_error` is off, is returned as an error.
    pub fn run(&self) -> SyncResult<PassReport> {
        let mapping = &self.mapping;
        if !mapping.strategy().cleans_rows() {
            debug!(
                entity = mapping.entity(),
                remote_type = mapping.remote_type(),
                "passive mapping, not cleaning"
            );
            return Ok(PassReport::passive());
        }

        let start = Instant::now();
        let mut report = PassReport::default();
        let mut processed = 0;

        for row in self.local.rows(mapping.entity())? {
            if self.config.limit_reached(processed) {
                break;
            }
            let Some(remote_id) = row.get(mapping.lookup_column()).map(ToString::to_string)
            else {
                continue;
            };
            processed += 1;

            if let Err(error) = self.clean_row(&row, &remote_id, &mut report) {
                if !self.config.continue_on_error {
                    return Err(error);
                }
                report.fail(remote_id, error);
            }
        }

        report.duration = start.elapsed();
        info!(
            entity = mapping.entity(),
            remote_type = mapping.remote_type(),
            examined = processed,
            deleted = report.deleted.len(),
            failed = report.failures.len(),
            "cleaning pass complete"
        );
        Ok(report)
    }

    fn clean_row(&self, row: &LocalRow, remote_id: &str, report: &mut PassReport) -> SyncResult<()> {
        let mapping = &self.mapping;
        let Some(id) = row.id() else {
            return Ok(());
        };

        let mut conditions = vec![id_condition(remote_id)];
        conditions.extend(mapping.conditions());
        if !self.remote.query(mapping.remote_type(), &conditions)?.is_empty() {
            report.unchanged += 1;
            return Ok(());
        }

        if self.local.delete(mapping.entity(), id)? {
            debug!(entity = mapping.entity(), %id, %remote_id, "deleted stale row");
            report.deleted.push(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::memory::{MemoryLocalStore, MemoryRemoteStore};
    use crate::record::RemoteRecord;
    use crate::schema::EntitySchema;

    fn schema() -> EntitySchema {
        EntitySchema::new("custom_objects")
            .column("name")
            .unique_column("remote_id")
    }

    fn mapping() -> Arc<Mapping> {
        Arc::new(
            Mapping::builder(schema(), "CustomObject__c")
                .field("name", "Name")
                .condition("Name = 'Scarborough Fair'")
                .build()
                .unwrap(),
        )
    }

    fn stores(names: &[(&str, &str)]) -> (MemoryLocalStore, MemoryRemoteStore) {
        let local = MemoryLocalStore::new().with_entity(schema());
        let remote = MemoryRemoteStore::new();
        for (id, name) in names {
            remote.insert(RemoteRecord::new("CustomObject__c", *id).with_field("Name", *name));
            local
                .insert(
                    &LocalRow::new("custom_objects")
                        .with_field("remote_id", *id)
                        .with_field("name", *name),
                )
                .unwrap();
        }
        (local, remote)
    }

    #[test]
    fn keeps_matching_rows() {
        let (local, remote) = stores(&[("a001", "Scarborough Fair")]);
        let report = Cleaner::new(mapping(), &local, &remote).run().unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.unchanged, 1);
        assert_eq!(local.count("custom_objects"), 1);
    }

    #[test]
    fn deletes_rows_that_stopped_matching() {
        let (local, remote) = stores(&[("a001", "Scarborough Fair"), ("a002", "Parsley")]);
        let report = Cleaner::new(mapping(), &local, &remote).run().unwrap();

        assert_eq!(report.deleted.len(), 1);
        assert_eq!(local.count("custom_objects"), 1);
    }

    #[test]
    fn deletes_rows_whose_remote_record_is_gone() {
        let (local, remote) = stores(&[("a001", "Scarborough Fair")]);
        remote.remove("CustomObject__c", "a001");

        let report = Cleaner::new(mapping(), &local, &remote).run().unwrap();
        assert_eq!(report.deleted.len(), 1);
        assert_eq!(local.count("custom_objects"), 0);
    }

    #[test]
    fn rows_without_lookup_are_ignored() {
        let (local, remote) = stores(&[]);
        local
            .insert(&LocalRow::new("custom_objects").with_field("name", "local only"))
            .unwrap();

        let report = Cleaner::new(mapping(), &local, &remote).run().unwrap();
        assert_eq!(report.changes(), 0);
        assert_eq!(remote.request_count(), 0);
        assert_eq!(local.count("custom_objects"), 1);
    }

    #[test]
    fn passive_mapping_is_not_cleaned() {
        let (local, remote) = stores(&[("a002", "Parsley")]);
        let passive = Arc::new(
            Mapping::builder(schema(), "CustomObject__c")
                .condition("Name = 'Scarborough Fair'")
                .through("Friend__c")
                .build()
                .unwrap(),
        );

        let report = Cleaner::new(passive, &local, &remote).run().unwrap();
        assert!(report.passive);
        assert_eq!(remote.request_count(), 0);
        assert_eq!(local.count("custom_objects"), 1);
    }

    #[test]
    fn remote_failure_keeps_rows() {
        let (local, remote) = stores(&[("a001", "Scarborough Fair"), ("a002", "Parsley")]);
        remote.set_offline(true);

        let report = Cleaner::new(mapping(), &local, &remote).run().unwrap();
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| f.error.is_retryable()));
        assert_eq!(local.count("custom_objects"), 2);
    }

    #[test]
    fn remote_failure_aborts_when_configured() {
        let (local, remote) = stores(&[("a001", "Scarborough Fair")]);
        remote.set_offline(true);

        let err = Cleaner::new(mapping(), &local, &remote)
            .with_config(SyncConfig::new().with_continue_on_error(false))
            .run()
            .unwrap_err();
        assert!(matches!(err, SyncError::Remote { .. }));
        assert_eq!(local.count("custom_objects"), 1);
    }

    #[test]
    fn max_items_caps_the_pass() {
        let (local, remote) = stores(&[("a001", "Parsley"), ("a002", "Sage")]);
        let report = Cleaner::new(mapping(), &local, &remote)
            .with_config(SyncConfig::new().with_max_items(1))
            .run()
            .unwrap();

        assert_eq!(report.deleted.len(), 1);
        assert_eq!(local.count("custom_objects"), 1);
    }
}
