//! Build sequences and their persistence.

use crate::error::{SyncError, SyncResult};
use crate::record::{Attributes, LocalRow, RemoteRecord, RowId, RowRef, Scope};
use crate::store::LocalStore;

/// Deepest chain of nested child builds followed from one primary row.
const MAX_NESTING: usize = 8;

/// Rows accumulated by one association build.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    rows: Vec<LocalRow>,
    depth: usize,
    origin: Option<Origin>,
}

/// The record a build started from, which must not reappear as its own
/// child.
#[derive(Debug)]
struct Origin {
    entity: String,
    object_type: String,
    id: String,
}

impl Graph {
    /// An empty build started from `remote`, the record of an `entity` row.
    pub(crate) fn from_origin(entity: &str, remote: &RemoteRecord) -> Self {
        Self {
            origin: Some(Origin {
                entity: entity.to_string(),
                object_type: remote.object_type.clone(),
                id: remote.id.clone(),
            }),
            ..Self::default()
        }
    }

    /// Returns true if `remote`, as a row of `entity`, is the record the build
    /// started from.
    pub(crate) fn is_origin(&self, entity: &str, remote: &RemoteRecord) -> bool {
        self.origin.as_ref().is_some_and(|origin| {
            origin.entity == entity
                && origin.object_type == remote.object_type
                && origin.id == remote.id
        })
    }

    /// Appends a row and returns its index.
    pub(crate) fn push(&mut self, row: LocalRow) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn row(&self, index: usize) -> Option<&LocalRow> {
        self.rows.get(index)
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> Option<&mut LocalRow> {
        self.rows.get_mut(index)
    }

    /// Finds a row already in the build that carries `lookups`.
    pub(crate) fn position(&self, entity: &str, lookups: &Attributes) -> Option<RowRef> {
        if lookups.is_empty() {
            return None;
        }
        let scope = Scope::entity(entity);
        let index = self
            .rows
            .iter()
            .position(|row| row.matches(&scope, lookups))?;
        Some(match self.rows[index].id() {
            Some(id) => RowRef::Saved(id),
            None => RowRef::Pending(index),
        })
    }

    pub(crate) fn into_rows(self) -> Vec<LocalRow> {
        self.rows
    }

    /// Enters one nesting level. Returns false once the limit is reached.
    pub(crate) fn descend(&mut self) -> bool {
        if self.depth >= MAX_NESTING {
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Persists a build sequence in order and returns the id of every row.
///
/// Pending links are replaced with the ids of the rows they point at. Only
/// the primary row at index 0 may point forward, at its own parents. Those
/// links are written once the parents are saved. A row that loses a
/// uniqueness race against a concurrent writer is merged into the row that
/// won.
pub fn persist_graph(store: &dyn LocalStore, rows: Vec<LocalRow>) -> SyncResult<Vec<RowId>> {
    let mut ids: Vec<RowId> = Vec::with_capacity(rows.len());
    let mut deferred: Vec<(String, usize)> = Vec::new();
    let mut primary_entity = None;

    for (position, mut row) in rows.into_iter().enumerate() {
        for (name, link) in row.links_mut() {
            if let RowRef::Pending(index) = *link {
                match ids.get(index) {
                    Some(id) => *link = RowRef::Saved(*id),
                    None if position == 0 && index > 0 => deferred.push((name.clone(), index)),
                    None => return Err(SyncError::InvalidReference { index, position }),
                }
            }
        }
        if position == 0 {
            for (name, _) in &deferred {
                row.remove_link(name);
            }
            primary_entity = Some(row.entity().to_string());
        }

        let id = match row.id() {
            Some(id) => {
                store.update(&row)?;
                id
            }
            None => insert_or_merge(store, &mut row)?,
        };
        ids.push(id);
    }

    if let (Some(entity), Some(&primary)) = (primary_entity, ids.first()) {
        if !deferred.is_empty() {
            let mut links = LocalRow::new(entity);
            links.set_id(primary);
            for (name, index) in deferred {
                let id = ids
                    .get(index)
                    .copied()
                    .ok_or(SyncError::InvalidReference { index, position: 0 })?;
                links.set_link(name, RowRef::Saved(id));
            }
            store.update(&links)?;
        }
    }

    Ok(ids)
}

fn insert_or_merge(store: &dyn LocalStore, row: &mut LocalRow) -> SyncResult<RowId> {
    let conflict = match store.insert(row) {
        Err(conflict @ SyncError::Conflict { .. }) => conflict,
        other => return other,
    };
    let SyncError::Conflict { column, .. } = &conflict else {
        return Err(conflict);
    };
    let Some(value) = row.get(column) else {
        return Err(conflict);
    };

    let lookups = Attributes::from([(column.clone(), value.clone())]);
    match store.find_by(&Scope::entity(row.entity()), &lookups)? {
        Some(existing) => match existing.id() {
            Some(id) => {
                tracing::debug!(
                    entity = row.entity(),
                    %id,
                    column = %column,
                    "merged into concurrently created row"
                );
                row.set_id(id);
                store.update(row)?;
                Ok(id)
            }
            None => Err(conflict),
        },
        // The winning row is already gone again; try once more.
        None => store.insert(row),
    }
}
