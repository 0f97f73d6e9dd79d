// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema validation for Flux entities
//!
//! Wraps the `jsonschema` engine. One validator per primitive type is
//! compiled lazily from the bundled `flux-entities.json` document (sections
//! `scene`, `types` and `entities`) and memoized for the whole process.

use crate::entity::primitive_name;
use crate::error::{Error, Result};
use crate::primitive::{is_non_standard, PrimitiveKind};
use crate::status::StatusMap;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex, OnceLock};

/// Error recorded when a primitive has no schema
pub const UNKNOWN_PRIMITIVE: &str = "Unknown primitive type.";

/// Status key used for objects without a `primitive` field
pub const UNDEFINED_KEY: &str = "undefined";

const SCHEMA_SOURCE: &str = include_str!("../schema/flux-entities.json");

/// Parsed schema document, shared by every validator
fn schema_document() -> Result<&'static Value> {
    static DOCUMENT: OnceLock<Value> = OnceLock::new();
    if let Some(doc) = DOCUMENT.get() {
        return Ok(doc);
    }
    let parsed: Value = serde_json::from_str(SCHEMA_SOURCE)?;
    Ok(DOCUMENT.get_or_init(|| parsed))
}

fn validator_cache() -> &'static Mutex<FxHashMap<String, Arc<JSONSchema>>> {
    static CACHE: OnceLock<Mutex<FxHashMap<String, Arc<JSONSchema>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(FxHashMap::default()))
}

/// Validates Flux entities against the bundled schema
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check an entity, recording failures into `status` under its primitive name.
    ///
    /// Non-standard primitives pass without a schema lookup.
    pub fn check_schema(&self, entity: &Value, status: &mut StatusMap) -> bool {
        let Some(name) = primitive_name(entity) else {
            status.append_error(UNDEFINED_KEY, UNKNOWN_PRIMITIVE);
            return false;
        };
        if is_non_standard(name) {
            return true;
        }

        let validator = match self.validator_for(name) {
            Ok(Some(validator)) => validator,
            Ok(None) => {
                status.append_error(name, UNKNOWN_PRIMITIVE);
                return false;
            }
            Err(e) => {
                status.append_error(name, &e.to_string());
                return false;
            }
        };

        let messages: Vec<String> = match validator.validate(entity) {
            Ok(()) => return true,
            Err(errors) => errors
                .map(|error| {
                    format_error(
                        &error.instance_path.to_string(),
                        &error.to_string(),
                        first_param(&error.kind),
                    )
                })
                .collect(),
        };

        status.append_error(name, &messages.join(", "));
        false
    }

    /// Compiled validator for a primitive type, `None` if the schema has no entry.
    ///
    /// The first successfully compiled validator for a name wins.
    pub fn validator_for(&self, name: &str) -> Result<Option<Arc<JSONSchema>>> {
        let Some(kind) = PrimitiveKind::from_name(name) else {
            return Ok(None);
        };
        let key = kind.name();

        if let Ok(cache) = validator_cache().lock() {
            if let Some(validator) = cache.get(key) {
                return Ok(Some(Arc::clone(validator)));
            }
        }

        let document = schema_document()?;
        let has_entry = document
            .get("entities")
            .and_then(|entities| entities.get(key))
            .is_some();
        if !has_entry {
            return Ok(None);
        }

        // Root the whole document at the entity definition so internal refs resolve
        let mut schema = document.clone();
        if let Value::Object(root) = &mut schema {
            root.insert("$ref".to_string(), Value::String(format!("#/entities/{}", key)));
        }

        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| Error::SchemaCompile {
                primitive: key.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(primitive = key, "Compiled schema validator");

        let compiled = Arc::new(compiled);
        match validator_cache().lock() {
            Ok(mut cache) => Ok(Some(Arc::clone(
                cache.entry(key.to_string()).or_insert(compiled),
            ))),
            Err(_) => Ok(Some(compiled)),
        }
    }
}

/// `<path>: <message> [<param>]`, dropping the path when empty and the
/// bracket when the message already mentions the parameter
fn format_error(path: &str, message: &str, param: Option<String>) -> String {
    let mut text = if path.is_empty() {
        message.to_string()
    } else {
        format!("{}: {}", path, message)
    };
    if let Some(param) = param {
        if !param.is_empty() && !message.contains(&param) {
            text.push_str(&format!(" [{}]", param));
        }
    }
    text
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First parameter of the engine error, where it carries one
fn first_param(kind: &ValidationErrorKind) -> Option<String> {
    match kind {
        ValidationErrorKind::Required { property } => Some(value_text(property)),
        ValidationErrorKind::Minimum { limit } => Some(value_text(limit)),
        ValidationErrorKind::ExclusiveMinimum { limit } => Some(value_text(limit)),
        ValidationErrorKind::Maximum { limit } => Some(value_text(limit)),
        ValidationErrorKind::ExclusiveMaximum { limit } => Some(value_text(limit)),
        ValidationErrorKind::MinItems { limit } => Some(limit.to_string()),
        ValidationErrorKind::MaxItems { limit } => Some(limit.to_string()),
        ValidationErrorKind::Enum { options } => Some(value_text(options)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_sphere() {
        let mut status = StatusMap::new();
        let entity = json!({"primitive": "sphere", "origin": [0, 0, 0], "radius": 1.5});
        assert!(SchemaValidator::new().check_schema(&entity, &mut status));
        assert!(status.is_empty());
    }

    #[test]
    fn test_negative_radius() {
        let mut status = StatusMap::new();
        let entity = json!({"primitive": "sphere", "origin": [0, 0, 0], "radius": -1});
        assert!(!SchemaValidator::new().check_schema(&entity, &mut status));
        let errors = status.errors("sphere");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("radius"), "unexpected message: {}", errors[0]);
    }

    #[test]
    fn test_missing_required_field() {
        let mut status = StatusMap::new();
        let entity = json!({"primitive": "line", "start": [0, 0, 0]});
        assert!(!SchemaValidator::new().check_schema(&entity, &mut status));
        assert!(status.errors("line")[0].contains("end"));
    }

    #[test]
    fn test_unknown_primitive() {
        let mut status = StatusMap::new();
        let entity = json!({"primitive": "teapot"});
        assert!(!SchemaValidator::new().check_schema(&entity, &mut status));
        assert_eq!(status.errors("teapot"), [UNKNOWN_PRIMITIVE.to_string()]);
    }

    #[test]
    fn test_non_standard_passes() {
        let mut status = StatusMap::new();
        let entity = json!({"primitive": "stl", "data": "solid empty\nendsolid empty"});
        assert!(SchemaValidator::new().check_schema(&entity, &mut status));
        assert!(status.is_empty());
    }

    #[test]
    fn test_validators_are_memoized() {
        let validator = SchemaValidator::new();
        let a = validator.validator_for("block").unwrap().unwrap();
        let b = validator.validator_for("block").unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_format_error() {
        assert_eq!(format_error("", "is bad", None), "is bad");
        assert_eq!(
            format_error("/radius", "-1 is less than or equal to the minimum of 0", Some("0".into())),
            "/radius: -1 is less than or equal to the minimum of 0"
        );
        assert_eq!(
            format_error("/side", "is not one of the options", Some("front".into())),
            "/side: is not one of the options [front]"
        );
    }
}
