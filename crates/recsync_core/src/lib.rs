//! # recsync core
//!
//! Mapping, association and cleanup core for reconciling a local relational
//! store with a remote object store.
//!
//! This crate provides:
//! - Mappings between a local entity type and a remote entity type
//! - Bidirectional field translation
//! - An explicit registry of mappings per local entity type
//! - Association resolution (belongs-to, has-one, has-many)
//! - Initialization, synchronization and cleaning passes per mapping
//! - In-memory store adapters
//!
//! ## Architecture
//!
//! A driver builds [`Mapping`]s, registers them in a [`Registry`] and runs
//! passes against a [`LocalStore`] and a [`RemoteStore`]:
//! 1. [`Initializer`] creates local rows for new remote records
//! 2. [`Synchronizer`] copies remote changes onto linked rows
//! 3. [`Cleaner`] deletes rows whose remote record no longer qualifies
//!
//! ## Key Invariants
//!
//! - The remote store is authoritative
//! - A lookup column is resolved once, when the mapping is built
//! - A passive mapping never creates or deletes rows on its own
//! - An association build is fully resolved or explicitly unresolved
//! - A remote failure never deletes a local row

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod association;
mod attribute_map;
mod cleaner;
mod config;
mod error;
mod initializer;
mod instance;
mod mapping;
pub mod memory;
mod record;
mod registry;
mod report;
mod schema;
mod store;
mod strategy;
mod synchronizer;
mod value;

pub use association::{
    persist_graph, Association, BelongsTo, BuildContext, BuildOutcome, HasMany, HasOne, Lookup,
    Owner,
};
pub use attribute_map::AttributeMap;
pub use cleaner::Cleaner;
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use initializer::Initializer;
pub use instance::{Instance, InstanceRecord, LocalInstance, RemoteInstance};
pub use mapping::{remote_type_slug, Mapping, MappingBuilder, GENERIC_LOOKUP_COLUMN};
pub use memory::{MemoryLocalStore, MemoryRemoteStore};
pub use record::{
    Attributes, LocalRow, ParentLink, RecordKind, RemoteRecord, RowId, RowRef, Scope,
};
pub use registry::Registry;
pub use report::{ItemFailure, PassReport};
pub use schema::EntitySchema;
pub use store::{eq_condition, id_condition, LocalStore, RemoteStore, REMOTE_ID_FIELD};
pub use strategy::Strategy;
pub use synchronizer::Synchronizer;
pub use value::Value;
