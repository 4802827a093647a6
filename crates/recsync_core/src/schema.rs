//! Local entity type descriptions.

use std::collections::BTreeSet;

/// Columns of one local entity type, as reported by the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    name: String,
    columns: BTreeSet<String>,
    unique: BTreeSet<String>,
}

impl EntitySchema {
    /// Creates a schema with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeSet::new(),
            unique: BTreeSet::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.insert(name.into());
        self
    }

    /// Adds several columns.
    #[must_use]
    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds a column whose non-null values must be unique across rows.
    #[must_use]
    pub fn unique_column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.columns.insert(name.clone());
        self.unique.insert(name);
        self
    }

    /// Entity type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the entity has the column.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    /// All columns.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Columns carrying a uniqueness constraint.
    pub fn unique_columns(&self) -> impl Iterator<Item = &str> {
        self.unique.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_columns_are_columns() {
        let schema = EntitySchema::new("custom_objects")
            .columns(["name", "example"])
            .unique_column("remote_id");

        assert!(schema.has_column("remote_id"));
        assert!(schema.has_column("name"));
        assert!(!schema.has_column("custom_object_remote_id"));
        assert_eq!(schema.unique_columns().collect::<Vec<_>>(), ["remote_id"]);
    }
}
