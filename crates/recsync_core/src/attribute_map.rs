//! Field name translation between the local and remote schemas.

use crate::record::{Attributes, RecordKind};
use std::collections::BTreeMap;

/// Bidirectional translator between local column names and remote field
/// names.
///
/// The map is keyed by local column. Attribute sets handed out by
/// [`AttributeMap::attributes`] are always keyed by local column, whichever
/// side they were read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    fields: BTreeMap<String, String>,
}

impl AttributeMap {
    /// Creates a map from `(local column, remote field)` pairs.
    pub fn new<I, L, R>(fields: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(local, remote)| (local.into(), remote.into()))
                .collect(),
        }
    }

    /// Local column to remote field pairs.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Mapped local columns.
    pub fn local_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Mapped remote fields.
    pub fn remote_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(String::as_str)
    }

    /// Extracts the mapped values of a raw record, keyed by local column.
    ///
    /// `fields` follows the naming of `kind`. Unmapped fields are omitted.
    pub fn attributes(&self, kind: RecordKind, fields: &Attributes) -> Attributes {
        let mut attributes = Attributes::new();
        for (local, remote) in &self.fields {
            let source = match kind {
                RecordKind::Local => local,
                RecordKind::Remote => remote,
            };
            if let Some(value) = fields.get(source) {
                attributes.insert(local.clone(), value.clone());
            }
        }
        attributes
    }

    /// Renames an attribute set into the naming of `target`.
    ///
    /// Converting to [`RecordKind::Local`] expects remote-keyed input and
    /// converting to [`RecordKind::Remote`] expects local-keyed input. Keys
    /// with no counterpart in the map are dropped.
    pub fn convert(&self, target: RecordKind, attributes: &Attributes) -> Attributes {
        let mut converted = Attributes::new();
        for (local, remote) in &self.fields {
            let (from, to) = match target {
                RecordKind::Local => (remote, local),
                RecordKind::Remote => (local, remote),
            };
            if let Some(value) = attributes.get(from) {
                converted.insert(to.clone(), value.clone());
            }
        }
        converted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn map() -> AttributeMap {
        AttributeMap::new([("name", "Name"), ("example", "Example_Field__c")])
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn attributes_from_remote_record() {
        let raw = attrs(&[
            ("Name", "Scarborough Fair"),
            ("Example_Field__c", "Parsley"),
            ("OwnerId", "005"),
        ]);

        let extracted = map().attributes(RecordKind::Remote, &raw);
        assert_eq!(
            extracted,
            attrs(&[("example", "Parsley"), ("name", "Scarborough Fair")])
        );
    }

    #[test]
    fn attributes_from_local_row() {
        let raw = attrs(&[("name", "Scarborough Fair"), ("remote_id", "a00")]);
        let extracted = map().attributes(RecordKind::Local, &raw);
        assert_eq!(extracted, attrs(&[("name", "Scarborough Fair")]));
    }

    #[test]
    fn convert_drops_unmapped_keys() {
        let local = attrs(&[("name", "Sage"), ("color", "green")]);
        let remote = map().convert(RecordKind::Remote, &local);
        assert_eq!(remote, attrs(&[("Name", "Sage")]));

        let back = map().convert(RecordKind::Local, &attrs(&[("Bogus__c", "x")]));
        assert!(back.is_empty());
    }

    #[test]
    fn convert_round_trips_mapped_keys() {
        let remote = attrs(&[("Name", "Rosemary"), ("Example_Field__c", "Thyme")]);
        let local = map().convert(RecordKind::Local, &remote);
        assert_eq!(map().convert(RecordKind::Remote, &local), remote);
    }

    #[test]
    fn field_lists() {
        let map = map();
        assert_eq!(map.local_fields().collect::<Vec<_>>(), ["example", "name"]);
        assert_eq!(
            map.remote_fields().collect::<Vec<_>>(),
            ["Example_Field__c", "Name"]
        );
    }
}
