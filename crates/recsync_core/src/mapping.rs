//! Mapping configuration between a local entity type and a remote type.

use crate::association::{Association, Lookup};
use crate::attribute_map::AttributeMap;
use crate::error::{SyncError, SyncResult};
use crate::record::{Attributes, RecordKind};
use crate::schema::EntitySchema;
use crate::strategy::Strategy;
use heck::ToSnakeCase;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Generic column storing the remote identifier.
pub const GENERIC_LOOKUP_COLUMN: &str = "remote_id";

/// Suffix the remote store appends to custom entity type names.
const CUSTOM_SUFFIX: &str = "__c";

/// Binds one local entity type to one remote entity type.
///
/// A mapping carries the field translation rules, the association
/// definitions, the query conditions remote records must satisfy, and the
/// ownership [`Strategy`]. Everything except the conditions is fixed once
/// [`MappingBuilder::build`] succeeds.
#[derive(Debug)]
pub struct Mapping {
    schema: EntitySchema,
    remote_type: String,
    attribute_map: AttributeMap,
    associations: Vec<Association>,
    conditions: RwLock<Vec<String>>,
    through: Option<String>,
    strategy: Strategy,
    lookup_column: String,
}

impl Mapping {
    /// Starts building a mapping from a local entity to a remote type.
    pub fn builder(schema: EntitySchema, remote_type: impl Into<String>) -> MappingBuilder {
        MappingBuilder::new(schema, remote_type)
    }

    /// Local entity type name.
    pub fn entity(&self) -> &str {
        self.schema.name()
    }

    /// Local entity schema.
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Remote entity type name.
    pub fn remote_type(&self) -> &str {
        &self.remote_type
    }

    /// Field translator.
    pub fn attribute_map(&self) -> &AttributeMap {
        &self.attribute_map
    }

    /// Association definitions, in declaration order.
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Looks up an association by name.
    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name() == name)
    }

    /// Association name to remote lookup field(s).
    pub fn association_map(&self) -> BTreeMap<&str, &Lookup> {
        self.associations
            .iter()
            .map(|a| (a.name(), a.lookup()))
            .collect()
    }

    /// Current query conditions.
    pub fn conditions(&self) -> Vec<String> {
        self.conditions.read().clone()
    }

    /// Replaces the query conditions.
    pub fn set_conditions<I, S>(&self, conditions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.conditions.write() = conditions.into_iter().map(Into::into).collect();
    }

    /// Remote lookup field this mapping's rows are derived through.
    pub fn through(&self) -> Option<&str> {
        self.through.as_deref()
    }

    /// Ownership strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Local column holding the remote identifier.
    pub fn lookup_column(&self) -> &str {
        &self.lookup_column
    }

    /// Remote fields a query must request for this mapping: every mapped
    /// field followed by every association lookup field.
    pub fn remote_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        let lookups = self.associations.iter().flat_map(|a| a.lookup().fields());
        for field in self.attribute_map.remote_fields().chain(lookups) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    /// Local columns covered by the field map.
    pub fn local_fields(&self) -> Vec<&str> {
        self.attribute_map.local_fields().collect()
    }

    /// Extracts mapped values from raw fields, keyed by local column.
    pub fn attributes(&self, kind: RecordKind, fields: &Attributes) -> Attributes {
        self.attribute_map.attributes(kind, fields)
    }

    /// Renames an attribute set into the naming of `target`.
    pub fn convert(&self, target: RecordKind, attributes: &Attributes) -> Attributes {
        self.attribute_map.convert(target, attributes)
    }
}

/// Builder for [`Mapping`].
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    schema: EntitySchema,
    remote_type: String,
    fields: Vec<(String, String)>,
    associations: Vec<Association>,
    conditions: Vec<String>,
    through: Option<String>,
}

impl MappingBuilder {
    /// Creates a builder with no fields, associations or conditions.
    pub fn new(schema: EntitySchema, remote_type: impl Into<String>) -> Self {
        Self {
            schema,
            remote_type: remote_type.into(),
            fields: Vec::new(),
            associations: Vec::new(),
            conditions: Vec::new(),
            through: None,
        }
    }

    /// Maps a local column to a remote field.
    #[must_use]
    pub fn field(mut self, local: impl Into<String>, remote: impl Into<String>) -> Self {
        self.fields.push((local.into(), remote.into()));
        self
    }

    /// Maps several local columns to remote fields.
    #[must_use]
    pub fn fields<I, L, R>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        self.fields
            .extend(fields.into_iter().map(|(l, r)| (l.into(), r.into())));
        self
    }

    /// Adds an association.
    #[must_use]
    pub fn association(mut self, association: impl Into<Association>) -> Self {
        self.associations.push(association.into());
        self
    }

    /// Adds a query condition.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Marks the mapping as derived through another mapping's lookup.
    #[must_use]
    pub fn through(mut self, lookup: impl Into<String>) -> Self {
        self.through = Some(lookup.into());
        self
    }

    /// Validates the configuration and builds the mapping.
    ///
    /// Fails with [`SyncError::InvalidMapping`] when the entity has no
    /// column to hold the remote id, or when a mapped column is missing.
    pub fn build(self) -> SyncResult<Mapping> {
        let lookup_column = resolve_lookup_column(&self.schema, &self.remote_type)?;

        if let Some((local, _)) = self
            .fields
            .iter()
            .find(|(local, _)| !self.schema.has_column(local))
        {
            return Err(SyncError::invalid_mapping(
                self.schema.name(),
                format!("unknown column `{local}`"),
            ));
        }

        let strategy = Strategy::for_through(self.through.as_deref());
        tracing::debug!(
            entity = self.schema.name(),
            remote_type = %self.remote_type,
            lookup_column = %lookup_column,
            ?strategy,
            "built mapping"
        );

        Ok(Mapping {
            attribute_map: AttributeMap::new(self.fields),
            schema: self.schema,
            remote_type: self.remote_type,
            associations: self.associations,
            conditions: RwLock::new(self.conditions),
            through: self.through,
            strategy,
            lookup_column,
        })
    }
}

/// Slug of a remote type name used to derive its dedicated lookup column.
///
/// `CustomObject__c` becomes `custom_object`.
pub fn remote_type_slug(remote_type: &str) -> String {
    remote_type
        .strip_suffix(CUSTOM_SUFFIX)
        .unwrap_or(remote_type)
        .to_snake_case()
}

fn resolve_lookup_column(schema: &EntitySchema, remote_type: &str) -> SyncResult<String> {
    let dedicated = format!("{}_{GENERIC_LOOKUP_COLUMN}", remote_type_slug(remote_type));
    if schema.has_column(&dedicated) {
        Ok(dedicated)
    } else if schema.has_column(GENERIC_LOOKUP_COLUMN) {
        Ok(GENERIC_LOOKUP_COLUMN.to_string())
    } else {
        Err(SyncError::invalid_mapping(
            schema.name(),
            format!("must define a `{dedicated}` or `{GENERIC_LOOKUP_COLUMN}` column"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::BelongsTo;

    fn schema() -> EntitySchema {
        EntitySchema::new("custom_objects")
            .columns(["name", "example"])
            .unique_column("remote_id")
    }

    fn mapping() -> Mapping {
        Mapping::builder(schema(), "CustomObject__c")
            .field("name", "Name")
            .field("example", "Example_Field__c")
            .association(BelongsTo::new("user", "users", "Friend__c"))
            .build()
            .unwrap()
    }

    #[test]
    fn slug_strips_custom_suffix() {
        assert_eq!(remote_type_slug("CustomObject__c"), "custom_object");
        assert_eq!(remote_type_slug("Contact"), "contact");
    }

    #[test]
    fn lookup_column_falls_back_to_generic() {
        assert_eq!(mapping().lookup_column(), "remote_id");
    }

    #[test]
    fn lookup_column_prefers_dedicated() {
        let schema = schema().column("custom_object_remote_id");
        let mapping = Mapping::builder(schema, "CustomObject__c").build().unwrap();
        assert_eq!(mapping.lookup_column(), "custom_object_remote_id");
    }

    #[test]
    fn missing_lookup_column_is_invalid() {
        let schema = EntitySchema::new("custom_objects").column("name");
        let err = Mapping::builder(schema, "CustomObject__c").build().unwrap_err();
        assert!(matches!(err, SyncError::InvalidMapping { .. }));
    }

    #[test]
    fn unknown_mapped_column_is_invalid() {
        let err = Mapping::builder(schema(), "CustomObject__c")
            .field("color", "Color__c")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("color"));
    }

    #[test]
    fn field_lists() {
        let mapping = mapping();
        assert_eq!(
            mapping.remote_fields(),
            ["Example_Field__c", "Name", "Friend__c"]
        );
        assert_eq!(mapping.local_fields(), ["example", "name"]);
        assert_eq!(mapping.association_map().len(), 1);
    }

    #[test]
    fn strategy_follows_through() {
        assert_eq!(mapping().strategy(), Strategy::Always);

        let passive = Mapping::builder(schema(), "CustomObject__c")
            .through("Friend__c")
            .build()
            .unwrap();
        assert_eq!(passive.strategy(), Strategy::Passive);
        assert_eq!(passive.through(), Some("Friend__c"));
    }

    #[test]
    fn conditions_can_be_reassigned() {
        let mapping = mapping();
        assert!(mapping.conditions().is_empty());

        mapping.set_conditions(["Name = 'Scarborough Fair'"]);
        assert_eq!(mapping.conditions(), ["Name = 'Scarborough Fair'"]);
    }
}
