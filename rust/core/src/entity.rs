// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flux entity access helpers
//!
//! Entities are untyped `serde_json::Value` trees. These helpers read the
//! handful of fields every stage needs without committing to a typed model.

use serde_json::{Map, Value};

/// Key holding the primitive discriminator
pub const PRIMITIVE_KEY: &str = "primitive";
/// Key holding the per-property unit map
pub const UNITS_KEY: &str = "units";

/// Primitive name of an entity, if it is an object with a string `primitive`
#[inline]
pub fn primitive_name(entity: &Value) -> Option<&str> {
    entity.get(PRIMITIVE_KEY).and_then(Value::as_str)
}

/// Whether an entity is a leaf primitive (object with a `primitive` field)
#[inline]
pub fn is_primitive(entity: &Value) -> bool {
    primitive_name(entity).is_some()
}

/// Case-insensitive key lookup in an object, preferring an exact match
pub fn find_key_ci<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    if let Some((k, _)) = object.get_key_value(key) {
        return Some(k.as_str());
    }
    object
        .keys()
        .find(|k| k.eq_ignore_ascii_case(key))
        .map(String::as_str)
}

/// Case-insensitive child lookup for a path segment.
///
/// Objects are searched by key, arrays by numeric index.
pub fn child_ci_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(object) => {
            let key = find_key_ci(object, segment)?.to_string();
            object.get_mut(&key)
        }
        Value::Array(items) => {
            let index: usize = segment.parse().ok()?;
            items.get_mut(index)
        }
        _ => None,
    }
}

/// Breps with inline `faces` and `vertices` can be tessellated locally
pub fn brep_has_inline_geometry(entity: &Value) -> bool {
    let non_empty = |key: &str| {
        entity
            .get(key)
            .and_then(Value::as_array)
            .is_some_and(|items| !items.is_empty())
    };
    non_empty("faces") && non_empty("vertices")
}

/// Material properties of an entity.
///
/// Reads `attributes.materialProperties` first and lets a top-level
/// `materialProperties` object override individual values.
pub fn material_properties(entity: &Value) -> Map<String, Value> {
    let mut merged = Map::new();
    let nested = entity
        .get("attributes")
        .and_then(|a| a.get("materialProperties"))
        .and_then(Value::as_object);
    let top = entity.get("materialProperties").and_then(Value::as_object);
    for source in [nested, top].into_iter().flatten() {
        for (key, value) in source {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}
