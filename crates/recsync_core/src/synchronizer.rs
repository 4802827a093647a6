//! Propagation of remote attribute changes onto existing local rows.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::instance::LocalInstance;
use crate::mapping::Mapping;
use crate::record::{Attributes, RecordKind, RemoteRecord, Scope};
use crate::report::PassReport;
use crate::store::{LocalStore, RemoteStore};
use crate::value::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Pushes the mapped fields of each remote record onto the local row linked
/// to it. The remote side wins every difference.
pub struct Synchronizer<'a> {
    mapping: Arc<Mapping>,
    local: &'a dyn LocalStore,
    remote: &'a dyn RemoteStore,
    config: SyncConfig,
}

impl<'a> Synchronizer<'a> {
    /// Creates a synchronizer for one mapping.
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

    /// Runs one synchronization pass.
    ///
    /// Records without a local row are skipped; creating them is the
    /// initializer's job.
    pub fn run(&self) -> SyncResult<PassReport> {
        let mapping = &self.mapping;
        let start = Instant::now();
        let mut report = PassReport::default();
        let records = self
            .remote
            .query(mapping.remote_type(), &mapping.conditions())?;

        for (processed, record) in records.iter().enumerate() {
            if self.config.limit_reached(processed) {
                break;
            }
            if let Err(error) = self.synchronize(record, &mut report) {
                if !self.config.continue_on_error {
                    return Err(error);
                }
                report.fail(&record.id, error);
            }
        }

        report.duration = start.elapsed();
        info!(
            entity = mapping.entity(),
            remote_type = mapping.remote_type(),
            updated = report.updated.len(),
            unchanged = report.unchanged,
            failed = report.failures.len(),
            "synchronization pass complete"
        );
        Ok(report)
    }

    fn synchronize(&self, record: &RemoteRecord, report: &mut PassReport) -> SyncResult<()> {
        let mapping = &self.mapping;
        let lookups = Attributes::from([(
            mapping.lookup_column().to_string(),
            Value::from(record.id.as_str()),
        )]);
        let Some(row) = self
            .local
            .find_by(&Scope::entity(mapping.entity()), &lookups)?
        else {
            debug!(entity = mapping.entity(), remote_id = %record.id, "no local row yet");
            report.skipped.push(record.id.clone());
            return Ok(());
        };

        let mut instance = LocalInstance::new(row, Arc::clone(mapping));
        let changes = changed_attributes(
            &instance.attributes(),
            &mapping.attributes(RecordKind::Remote, &record.fields),
        );
        if changes.is_empty() {
            report.unchanged += 1;
            return Ok(());
        }

        instance.update(self.local, &changes)?;
        if let Some(id) = instance.record().id() {
            debug!(
                entity = mapping.entity(),
                %id,
                columns = changes.len(),
                "updated row"
            );
            report.updated.push(id);
        }
        Ok(())
    }
}

/// Entries of `incoming` that differ from `current`. A missing column reads
/// as null.
fn changed_attributes(current: &Attributes, incoming: &Attributes) -> Attributes {
    incoming
        .iter()
        .filter(|(column, value)| current.get(*column).unwrap_or(&Value::Null) != *value)
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}
