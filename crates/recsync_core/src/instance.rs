//! Records paired with the mapping that interprets them.

use crate::error::SyncResult;
use crate::mapping::Mapping;
use crate::record::{Attributes, LocalRow, RecordKind, RemoteRecord};
use crate::store::{LocalStore, RemoteStore};
use std::sync::Arc;

/// A raw record an [`Instance`] can wrap.
pub trait InstanceRecord {
    /// Which store the record belongs to.
    const KIND: RecordKind;

    /// Store adapter the record persists through.
    type Store<'s>: ?Sized;

    /// Raw field values, keyed in the record's own naming.
    fn fields(&self) -> &Attributes;

    /// Writes `attributes`, keyed in the record's own naming, through the
    /// store and onto the in-memory record.
    fn persist(&mut self, store: &Self::Store<'_>, attributes: &Attributes) -> SyncResult<()>;

    /// Returns true if the record exists in its store.
    fn synced(&self) -> bool {
        true
    }

    /// Hook run after a successful update.
    fn after_sync(&mut self, _store: &Self::Store<'_>) -> SyncResult<()> {
        Ok(())
    }
}

impl InstanceRecord for LocalRow {
    const KIND: RecordKind = RecordKind::Local;
    type Store<'s> = dyn LocalStore + 's;

    fn fields(&self) -> &Attributes {
        LocalRow::fields(self)
    }

    fn persist(&mut self, store: &Self::Store<'_>, attributes: &Attributes) -> SyncResult<()> {
        let mut next = self.clone();
        next.assign(attributes);
        match next.id() {
            Some(_) => store.update(&next)?,
            None => {
                let id = store.insert(&next)?;
                next.set_id(id);
            }
        }
        *self = next;
        Ok(())
    }

    fn synced(&self) -> bool {
        self.is_persisted()
    }
}

impl InstanceRecord for RemoteRecord {
    const KIND: RecordKind = RecordKind::Remote;
    type Store<'s> = dyn RemoteStore + 's;

    fn fields(&self) -> &Attributes {
        &self.fields
    }

    fn persist(&mut self, store: &Self::Store<'_>, attributes: &Attributes) -> SyncResult<()> {
        store.update(&self.object_type, &self.id, attributes)?;
        self.fields
            .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

/// One record on either side of a mapping.
#[derive(Debug, Clone)]
pub struct Instance<R> {
    record: R,
    mapping: Arc<Mapping>,
}

/// An instance wrapping a local row.
pub type LocalInstance = Instance<LocalRow>;

/// An instance wrapping a remote record.
pub type RemoteInstance = Instance<RemoteRecord>;

impl<R: InstanceRecord> Instance<R> {
    /// Wraps `record` with its mapping.
    pub fn new(record: R, mapping: Arc<Mapping>) -> Self {
        Self { record, mapping }
    }

    /// The wrapped record.
    pub fn record(&self) -> &R {
        &self.record
    }

    /// Unwraps the record.
    pub fn into_record(self) -> R {
        self.record
    }

    /// The mapping interpreting the record.
    pub fn mapping(&self) -> &Arc<Mapping> {
        &self.mapping
    }

    /// Which store the record belongs to.
    pub fn kind(&self) -> RecordKind {
        R::KIND
    }

    /// Mapped values of the record, keyed by local column.
    pub fn attributes(&self) -> Attributes {
        self.mapping.attributes(R::KIND, self.record.fields())
    }

    /// Writes `attributes`, keyed in the record's own naming, and runs the
    /// after-sync hook.
    ///
    /// An empty set is a no-op. Store errors are returned as-is.
    pub fn update(
        &mut self,
        store: &R::Store<'_>,
        attributes: &Attributes,
    ) -> SyncResult<&mut Self> {
        if attributes.is_empty() {
            return Ok(self);
        }
        self.record.persist(store, attributes)?;
        self.record.after_sync(store)?;
        Ok(self)
    }

    /// Returns true if the record exists in its store.
    pub fn synced(&self) -> bool {
        self.record.synced()
    }
}
