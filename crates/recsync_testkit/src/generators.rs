//! Property-based test generators using proptest.

use proptest::prelude::*;
use recsync_core::{Attributes, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Strategy for generating local column names.
pub fn column_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating remote field names, custom or standard.
pub fn remote_field_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][A-Za-z0-9]{0,11}(_[A-Za-z]{1,8})?(__c)?")
        .expect("Invalid regex")
}

/// Strategy for generating remote ids.
pub fn remote_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("a0[0-9A-Za-z]{13}").expect("Invalid regex")
}

/// Strategy for generating field values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        prop::string::string_regex("[ -~]{0,24}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
    ]
}

/// Strategy for generating field maps from local column to remote field,
/// with every remote field used once.
pub fn field_map_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(column_name_strategy(), remote_field_strategy(), 0..8)
        .prop_filter("Remote fields must be unique", |map| {
            map.values().collect::<BTreeSet<_>>().len() == map.len()
        })
}

/// Strategy for generating a field map together with a remote attribute set
/// covering every mapped field.
pub fn mapped_attributes_strategy(
) -> impl Strategy<Value = (BTreeMap<String, String>, Attributes)> {
    field_map_strategy()
        .prop_flat_map(|map| {
            let len = map.len();
            (Just(map), prop::collection::vec(value_strategy(), len))
        })
        .prop_map(|(map, values)| {
            let remote = map.values().cloned().zip(values).collect();
            (map, remote)
        })
}
