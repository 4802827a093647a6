//! Recursive expansion shared by every association kind.
//!
//! A row reached through one association is expanded through the
//! associations of its own mappings: its belongs-to parents are resolved
//! and its has-one/has-many children are built. The association the row
//! was reached through is never walked back.

use super::graph::Graph;
use super::{Association, BelongsTo, BuildContext, Lookup, Owner};
use crate::error::SyncResult;
use crate::mapping::Mapping;
use crate::record::{Attributes, LocalRow, RecordKind, RemoteRecord, RowRef, Scope};
use crate::store::eq_condition;
use crate::value::Value;
use std::sync::Arc;

pub(super) enum Resolution {
    Resolved,
    Unresolved,
}

/// What a has-one or has-many association needs to build its rows.
pub(super) struct ChildSide<'a> {
    pub(super) target: &'a str,
    pub(super) inverse: &'a str,
    pub(super) lookup: &'a Lookup,
    pub(super) limit: Option<usize>,
}

/// How a row entered the build.
#[derive(Clone, Copy)]
enum Reached<'a> {
    /// The row the build starts from.
    Root,
    /// As the parent `entity` points at through its link `link`.
    Parent { entity: &'a str, link: &'a str },
    /// As a child of `owner`, linked back through `link`.
    Child { owner: &'a str, link: &'a str },
}

impl Reached<'_> {
    fn walks_back(&self, association: &Association) -> bool {
        match (*self, association) {
            (Reached::Parent { entity, link }, Association::HasOne(a)) => {
                a.target == entity && a.inverse == link
            }
            (Reached::Parent { entity, link }, Association::HasMany(a)) => {
                a.target == entity && a.inverse == link
            }
            (Reached::Child { owner, link }, Association::BelongsTo(a)) => {
                a.target == owner && a.name == link
            }
            _ => false,
        }
    }
}

/// Remote parents one belongs-to lookup resolves to, across the target's
/// mappings.
struct Parents {
    lookups: Attributes,
    attributes: Attributes,
    remotes: Vec<(Arc<Mapping>, RemoteRecord)>,
}

enum ParentRef {
    /// The lookup field is absent or null.
    Absent,
    Unresolved,
    Linked(RowRef),
}

/// Builds the primary row of a belongs-to build, then its parents and
/// children.
///
/// The primary row stays first. Its links to new parents of its own point
/// forward and are written by `persist_graph` once those parents exist.
pub(super) fn build_primary(
    ctx: &BuildContext<'_>,
    association: &BelongsTo,
    owner: Owner<'_>,
    remote: &RemoteRecord,
    graph: &mut Graph,
) -> SyncResult<Resolution> {
    let Some(parents) = fetch_parents(ctx, association, remote)? else {
        return Ok(Resolution::Unresolved);
    };
    if parents.remotes.is_empty() {
        return Ok(Resolution::Resolved);
    }

    let row = find_or_build(ctx, &association.target, parents.lookups, &parents.attributes)?;
    let is_new = !row.is_persisted();
    let index = graph.push(row);
    let reached = Reached::Parent {
        entity: owner.entity,
        link: &association.name,
    };

    if is_new {
        let Some(links) = link_parents(ctx, &parents.remotes, reached, graph)? else {
            return Ok(Resolution::Unresolved);
        };
        if let Some(row) = graph.row_mut(index) {
            for (name, link) in links {
                row.set_link(name, link);
            }
        }
    }

    let primary = owner_at(graph, &association.target, index);
    expand_children(ctx, primary, &parents.remotes, reached, graph)
}

/// Builds the target rows whose remote records point at `remote`.
///
/// Every row lands in the owner's scope and links back to the owner through
/// `side.inverse`. Each row is then expanded through its own associations.
pub(super) fn build_children_of(
    ctx: &BuildContext<'_>,
    side: &ChildSide<'_>,
    owner: Owner<'_>,
    remote: &RemoteRecord,
    graph: &mut Graph,
) -> SyncResult<Resolution> {
    let Some(owner_row) = owner.row else {
        tracing::debug!(
            target_entity = side.target,
            "owner has no row yet, skipping child build"
        );
        return Ok(Resolution::Resolved);
    };

    let mut built = 0;
    for mapping in ctx.registry.for_entity_type(side.target) {
        let Some(field) = side.lookup.field_for(mapping.remote_type()) else {
            continue;
        };
        let mut conditions = vec![eq_condition(field, &remote.id)];
        conditions.extend(mapping.conditions());

        for child in ctx.remote.query(mapping.remote_type(), &conditions)? {
            if side.limit.is_some_and(|limit| built >= limit) {
                return Ok(Resolution::Resolved);
            }
            let reached = Reached::Child {
                owner: owner.entity,
                link: side.inverse,
            };
            let resolution =
                materialize(ctx, side, Arc::clone(&mapping), owner_row, child, reached, graph)?;
            if let Resolution::Unresolved = resolution {
                return Ok(Resolution::Unresolved);
            }
            built += 1;
        }
    }

    Ok(Resolution::Resolved)
}

/// Builds the children of `row`, the row for `remote`, ahead of any write.
///
/// Returns the row and its children in build order. The children point at
/// the row as `RowRef::Pending(0)`. Returns `None` if a lookup anywhere
/// below the row does not resolve.
pub(crate) fn build_with_children(
    ctx: &BuildContext<'_>,
    mapping: &Arc<Mapping>,
    row: LocalRow,
    remote: &RemoteRecord,
) -> SyncResult<Option<(LocalRow, Vec<LocalRow>)>> {
    let mut graph = Graph::default();
    let index = graph.push(row);
    let owner = owner_at(&graph, mapping.entity(), index);
    let remotes = [(Arc::clone(mapping), remote.clone())];
    match expand_children(ctx, owner, &remotes, Reached::Root, &mut graph)? {
        Resolution::Resolved => {
            let mut rows = graph.into_rows().into_iter();
            Ok(rows.next().map(|row| (row, rows.collect())))
        }
        Resolution::Unresolved => Ok(None),
    }
}

fn materialize(
    ctx: &BuildContext<'_>,
    side: &ChildSide<'_>,
    mapping: Arc<Mapping>,
    owner_row: RowRef,
    child: RemoteRecord,
    reached: Reached<'_>,
    graph: &mut Graph,
) -> SyncResult<Resolution> {
    let scope = Scope::owned_by(side.target, side.inverse, owner_row);
    let lookups = Attributes::from([(
        mapping.lookup_column().to_string(),
        Value::from(child.id.as_str()),
    )]);
    // Already part of this build, either as its origin or through another path.
    if graph.is_origin(side.target, &child) || graph.position(side.target, &lookups).is_some() {
        return Ok(Resolution::Resolved);
    }

    // Rows scoped to a pending owner cannot exist yet.
    let existing = match owner_row {
        RowRef::Saved(_) => ctx.local.find_by(&scope, &lookups)?,
        RowRef::Pending(_) => None,
    };
    let mut row = match existing {
        Some(row) => row,
        None => ctx.local.build(&scope, lookups),
    };
    row.assign(&mapping.convert(RecordKind::Local, &child.fields));

    let remotes = [(mapping, child)];
    if !row.is_persisted() {
        let Some(links) = link_parents(ctx, &remotes, reached, graph)? else {
            return Ok(Resolution::Unresolved);
        };
        for (name, link) in links {
            row.set_link(name, link);
        }
    }

    let index = graph.push(row);
    let owner = owner_at(graph, side.target, index);
    expand_children(ctx, owner, &remotes, reached, graph)
}

/// Resolves every belongs-to association of the row's mappings.
///
/// New parents are pushed before the caller pushes the row, so the returned
/// links point backwards unless the row is the primary. Returns `None` as
/// soon as one lookup dangles.
fn link_parents(
    ctx: &BuildContext<'_>,
    remotes: &[(Arc<Mapping>, RemoteRecord)],
    reached: Reached<'_>,
    graph: &mut Graph,
) -> SyncResult<Option<Vec<(String, RowRef)>>> {
    let mut links = Vec::new();
    for (mapping, remote) in remotes {
        for association in mapping.associations() {
            let Association::BelongsTo(parent) = association else {
                continue;
            };
            if reached.walks_back(association) {
                continue;
            }
            match resolve_parent(ctx, parent, mapping.entity(), remote, graph)? {
                ParentRef::Absent => {}
                ParentRef::Unresolved => return Ok(None),
                ParentRef::Linked(link) => links.push((parent.name.clone(), link)),
            }
        }
    }
    Ok(Some(links))
}

fn resolve_parent(
    ctx: &BuildContext<'_>,
    association: &BelongsTo,
    entity: &str,
    remote: &RemoteRecord,
    graph: &mut Graph,
) -> SyncResult<ParentRef> {
    let Some(parents) = fetch_parents(ctx, association, remote)? else {
        return Ok(ParentRef::Unresolved);
    };
    if parents.remotes.is_empty() {
        return Ok(ParentRef::Absent);
    }
    if let Some(link) = graph.position(&association.target, &parents.lookups) {
        return Ok(ParentRef::Linked(link));
    }

    if !graph.descend() {
        tracing::warn!(
            association = %association.name,
            remote_id = %remote.id,
            "association nesting limit reached, parent left unresolved"
        );
        return Ok(ParentRef::Unresolved);
    }
    let result = place_parent(ctx, association, entity, parents, graph);
    graph.ascend();
    result
}

fn place_parent(
    ctx: &BuildContext<'_>,
    association: &BelongsTo,
    entity: &str,
    parents: Parents,
    graph: &mut Graph,
) -> SyncResult<ParentRef> {
    let mut row = find_or_build(ctx, &association.target, parents.lookups, &parents.attributes)?;
    let reached = Reached::Parent {
        entity,
        link: &association.name,
    };

    if !row.is_persisted() {
        let Some(links) = link_parents(ctx, &parents.remotes, reached, graph)? else {
            return Ok(ParentRef::Unresolved);
        };
        for (name, link) in links {
            row.set_link(name, link);
        }
    }

    let index = graph.push(row);
    let parent = owner_at(graph, &association.target, index);
    match expand_children(ctx, parent, &parents.remotes, reached, graph)? {
        Resolution::Resolved => Ok(parent.row.map_or(ParentRef::Absent, ParentRef::Linked)),
        Resolution::Unresolved => Ok(ParentRef::Unresolved),
    }
}

/// Builds the has-one/has-many children of the row at `owner`.
fn expand_children(
    ctx: &BuildContext<'_>,
    owner: Owner<'_>,
    remotes: &[(Arc<Mapping>, RemoteRecord)],
    reached: Reached<'_>,
    graph: &mut Graph,
) -> SyncResult<Resolution> {
    if !graph.descend() {
        tracing::warn!(entity = owner.entity, "association nesting limit reached");
        return Ok(Resolution::Resolved);
    }
    let result = expand_each_child(ctx, owner, remotes, reached, graph);
    graph.ascend();
    result
}

fn expand_each_child(
    ctx: &BuildContext<'_>,
    owner: Owner<'_>,
    remotes: &[(Arc<Mapping>, RemoteRecord)],
    reached: Reached<'_>,
    graph: &mut Graph,
) -> SyncResult<Resolution> {
    for (mapping, remote) in remotes {
        for association in mapping.associations() {
            let side = match association {
                Association::BelongsTo(_) => continue,
                Association::HasOne(a) => a.side(),
                Association::HasMany(a) => a.side(),
            };
            if reached.walks_back(association) {
                continue;
            }
            if let Resolution::Unresolved = build_children_of(ctx, &side, owner, remote, graph)? {
                return Ok(Resolution::Unresolved);
            }
        }
    }
    Ok(Resolution::Resolved)
}

/// Looks up the remote parents of `remote` through `association`.
///
/// Returns `None` if a lookup id names a remote record that does not exist.
fn fetch_parents(
    ctx: &BuildContext<'_>,
    association: &BelongsTo,
    remote: &RemoteRecord,
) -> SyncResult<Option<Parents>> {
    let mut parents = Parents {
        lookups: Attributes::new(),
        attributes: Attributes::new(),
        remotes: Vec::new(),
    };

    for mapping in ctx.registry.for_entity_type(&association.target) {
        let Some(field) = association.lookup.field_for(mapping.remote_type()) else {
            continue;
        };
        let Some(parent_id) = remote.get(field) else {
            continue;
        };
        let parent_id = parent_id.to_string();

        let Some(parent) = ctx.remote.find(mapping.remote_type(), &parent_id)? else {
            tracing::debug!(
                association = %association.name,
                remote_type = mapping.remote_type(),
                %parent_id,
                "lookup does not resolve, skipping build"
            );
            return Ok(None);
        };

        parents
            .lookups
            .insert(mapping.lookup_column().to_string(), Value::Text(parent_id));
        parents
            .attributes
            .extend(mapping.convert(RecordKind::Local, &parent.fields));
        parents.remotes.push((mapping, parent));
    }

    Ok(Some(parents))
}

fn find_or_build(
    ctx: &BuildContext<'_>,
    entity: &str,
    lookups: Attributes,
    attributes: &Attributes,
) -> SyncResult<LocalRow> {
    let scope = Scope::entity(entity);
    let mut row = match ctx.local.find_by(&scope, &lookups)? {
        Some(row) => row,
        None => ctx.local.build(&scope, lookups),
    };
    row.assign(attributes);
    Ok(row)
}

/// The row at `index` as the owner of further builds.
fn owner_at<'a>(graph: &Graph, entity: &'a str, index: usize) -> Owner<'a> {
    match graph.row(index).and_then(LocalRow::id) {
        Some(id) => Owner::saved(entity, id),
        None => Owner::pending(entity, index),
    }
}
