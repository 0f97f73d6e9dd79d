// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flattening of nested entity trees into per-material buckets.
//!
//! Arrays are walked depth-first and primitive objects are leaves.
//! Containers (`polycurve`, `polysurface`) are replaced by their members,
//! and breps without inline geometry are queued for an external resolver.

use flux_lite_core::entity::{brep_has_inline_geometry, primitive_name};
use flux_lite_core::{MaterialKind, PrimitiveKind, StatusMap, UNKNOWN_PRIMITIVE};
use serde_json::Value;

/// A leaf primitive borrowed from the input tree
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub kind: PrimitiveKind,
    /// Primitive name as written, used as the status key
    pub name: &'a str,
    pub entity: &'a Value,
}

/// Leaf primitives grouped by the material kind they render with
#[derive(Debug, Default)]
pub struct Flattened<'a> {
    pub points: Vec<Entry<'a>>,
    pub lines: Vec<Entry<'a>>,
    pub meshes: Vec<Entry<'a>>,
    /// Breps that need an external geometry service
    pub async_prims: Vec<&'a Value>,
}

impl<'a> Flattened<'a> {
    /// Number of entities queued for local building
    pub fn len(&self) -> usize {
        self.points.len() + self.lines.len() + self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.async_prims.is_empty()
    }

    fn push(&mut self, entry: Entry<'a>) {
        match entry.kind.material_kind() {
            MaterialKind::Point => self.points.push(entry),
            MaterialKind::Line => self.lines.push(entry),
            MaterialKind::Phong => self.meshes.push(entry),
        }
    }
}

/// Flatten `data` into buckets, recording unknown primitives in `status`.
pub fn flatten<'a>(data: &'a Value, status: &mut StatusMap) -> Flattened<'a> {
    let mut out = Flattened::default();
    walk(data, status, &mut out);
    tracing::debug!(
        points = out.points.len(),
        lines = out.lines.len(),
        meshes = out.meshes.len(),
        async_prims = out.async_prims.len(),
        "Flattened entities"
    );
    out
}

fn walk<'a>(value: &'a Value, status: &mut StatusMap, out: &mut Flattened<'a>) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item, status, out);
            }
        }
        Value::Object(_) => {
            let Some(name) = primitive_name(value) else {
                tracing::warn!("Skipping object without a primitive type");
                return;
            };
            let Some(kind) = PrimitiveKind::from_name(name) else {
                status.append_error(name, UNKNOWN_PRIMITIVE);
                return;
            };
            match kind {
                PrimitiveKind::Polycurve => unwrap_members(value, name, "curves", status, out),
                PrimitiveKind::Polysurface => unwrap_members(value, name, "surfaces", status, out),
                PrimitiveKind::Brep if !brep_has_inline_geometry(value) => out.async_prims.push(value),
                _ => out.push(Entry { kind, name, entity: value }),
            }
        }
        _ => tracing::warn!("Skipping non-object entity"),
    }
}

fn unwrap_members<'a>(
    container: &'a Value,
    name: &str,
    key: &str,
    status: &mut StatusMap,
    out: &mut Flattened<'a>,
) {
    match container.get(key) {
        Some(members @ Value::Array(_)) => walk(members, status, out),
        _ => status.append_error(name, &format!("Missing required property '{}'", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_arrays_are_bucketed() {
        let data = json!([
            {"primitive": "point", "point": [0, 0, 0]},
            [
                {"primitive": "line", "start": [0, 0, 0], "end": [1, 0, 0]},
                [{"primitive": "sphere", "origin": [0, 0, 0], "radius": 1}]
            ],
            {"primitive": "circle", "origin": [0, 0, 0], "radius": 1}
        ]);
        let mut status = StatusMap::new();
        let flat = flatten(&data, &mut status);
        assert_eq!(flat.points.len(), 1);
        assert_eq!(flat.lines.len(), 2);
        assert_eq!(flat.meshes.len(), 1);
        assert_eq!(flat.lines[1].name, "circle");
        assert!(status.is_empty());
    }

    #[test]
    fn test_containers_are_unwrapped() {
        let data = json!({
            "primitive": "polycurve",
            "curves": [
                {"primitive": "line", "start": [0, 0, 0], "end": [1, 0, 0]},
                {"primitive": "arc", "start": [1, 0, 0], "middle": [2, 1, 0], "end": [3, 0, 0]}
            ]
        });
        let mut status = StatusMap::new();
        let flat = flatten(&data, &mut status);
        assert_eq!(flat.lines.len(), 2);
        assert!(flat.lines.iter().all(|e| e.kind != PrimitiveKind::Polycurve));

        let broken = json!({"primitive": "polysurface"});
        let flat = flatten(&broken, &mut status);
        assert!(flat.is_empty());
        assert_eq!(status.errors("polysurface"), ["Missing required property 'surfaces'"]);
    }

    #[test]
    fn test_breps_without_geometry_are_queued() {
        let data = json!([
            {"primitive": "brep", "content": "opaque", "format": "x_t"},
            {"primitive": "brep", "faces": [[0, 1, 2]], "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]]}
        ]);
        let mut status = StatusMap::new();
        let flat = flatten(&data, &mut status);
        assert_eq!(flat.async_prims.len(), 1);
        assert_eq!(flat.meshes.len(), 1);
    }

    #[test]
    fn test_unknown_primitive_is_recorded() {
        let data = json!([{"primitive": "hyperboloid"}, {"name": "not a primitive"}, 42]);
        let mut status = StatusMap::new();
        let flat = flatten(&data, &mut status);
        assert_eq!(flat.len(), 0);
        assert_eq!(status.errors("hyperboloid"), [UNKNOWN_PRIMITIVE]);
        assert_eq!(status.len(), 1);
    }
}
