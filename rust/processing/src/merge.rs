// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh merging and buffer upgrade.

use flux_lite_geometry::mesh::color_bits;
use flux_lite_geometry::{Geometry, SceneObject};
use std::cmp::Ordering;

/// Name given to objects that absorbed at least one other mesh
pub const MERGED_NAME: &str = "merged";

#[inline]
fn color_signature(object: &SceneObject) -> Option<[u32; 3]> {
    object.geometry.uniform_color().map(|c| color_bits(&c))
}

fn merge_order(a: &SceneObject, b: &SceneObject) -> Ordering {
    a.material_key()
        .cmp(b.material_key())
        .then_with(|| color_signature(a).cmp(&color_signature(b)))
}

fn can_merge(target: &SceneObject, source: &SceneObject) -> bool {
    target.geometry.is_indexed()
        && source.geometry.is_indexed()
        && target.material_key() == source.material_key()
        && color_signature(target).is_some()
        && color_signature(target) == color_signature(source)
        && target.geometry.has_face_uvs() == source.geometry.has_face_uvs()
}

/// Sort objects by material and color, then fold compatible neighbours.
///
/// Returns the surviving objects and the number of merges performed.
pub fn merge(mut objects: Vec<SceneObject>) -> (Vec<SceneObject>, usize) {
    objects.sort_by(merge_order);

    let mut merged: Vec<SceneObject> = Vec::with_capacity(objects.len());
    let mut count = 0;
    for object in objects {
        if let Some(target) = merged.last_mut() {
            if can_merge(target, &object) {
                // Source vertices go into the target's local space
                if let Some(inverse) = target.transform.try_inverse() {
                    let to_local = inverse * object.transform;
                    if let (Geometry::Indexed(into), Geometry::Indexed(from)) =
                        (&mut target.geometry, &object.geometry)
                    {
                        into.merge(from, &to_local);
                        target.name = MERGED_NAME.to_string();
                        count += 1;
                        continue;
                    }
                } else {
                    tracing::debug!(name = %target.name, "Skipping merge into non-invertible transform");
                }
            }
        }
        merged.push(object);
    }

    tracing::debug!(before = merged.len() + count, after = merged.len(), "Merged meshes");
    (merged, count)
}

/// Replace every indexed mesh with its flat vertex-buffer form
pub fn upgrade(objects: Vec<SceneObject>) -> Vec<SceneObject> {
    objects
        .into_iter()
        .map(|mut object| {
            if let Geometry::Indexed(mesh) = &object.geometry {
                object.geometry = Geometry::Buffer(mesh.to_buffer());
            }
            object
        })
        .collect()
}
