// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solid primitives
//!
//! Parametric solids are generated in a local frame with per-face UVs and
//! placed by the shared post-step. Cones, cylinders and spheres are built
//! around +Y and turned Z-up; tori and blocks are built Z-up directly.

use crate::material::Material;
use crate::mesh::{Geometry, IndexedGeometry, SceneObject};
use crate::transform::{finish_object, Frame};
use crate::{parse, GeometryError, Point2, Point3, Result, Vector3};
use serde_json::Value;
use smallvec::SmallVec;
use std::f64::consts::{PI, TAU};
use std::sync::Arc;

pub const RADIAL_SEGMENTS: usize = 32;
pub const SPHERE_WIDTH_SEGMENTS: usize = 32;
pub const SPHERE_HEIGHT_SEGMENTS: usize = 16;
pub const TORUS_RADIAL_SEGMENTS: usize = 16;
pub const TORUS_TUBULAR_SEGMENTS: usize = 32;

/// Index list of one input face; most faces are triangles or quads
type FaceIndices = SmallVec<[u32; 4]>;

#[inline]
fn uv(u: f64, v: f64) -> Point2<f64> {
    Point2::new(u, v)
}

/// Frustum along +Y from `y = 0` (radius `bottom`) to `y = height` (radius
/// `top`), capped at each end with a non-zero radius
fn frustum(bottom: f64, top: f64, height: f64) -> IndexedGeometry {
    let segments = RADIAL_SEGMENTS;
    let mut mesh = IndexedGeometry::with_capacity(4 * (segments + 1) + 2, 4 * segments);
    let ring = |radius: f64, y: f64, i: usize| {
        let theta = TAU * i as f64 / segments as f64;
        Point3::new(radius * theta.sin(), y, radius * theta.cos())
    };

    let row = (segments + 1) as u32;
    let base = mesh.vertex_count() as u32;
    for (radius, y) in [(bottom, 0.0), (top, height)] {
        for i in 0..=segments {
            mesh.add_vertex(ring(radius, y, i));
        }
    }
    for i in 0..segments as u32 {
        let (b0, b1) = (base + i, base + i + 1);
        let (t0, t1) = (b0 + row, b1 + row);
        let (u0, u1) = (i as f64 / segments as f64, (i + 1) as f64 / segments as f64);
        if bottom > 0.0 {
            mesh.add_face_with_uvs(b0, b1, t1, [uv(u0, 0.0), uv(u1, 0.0), uv(u1, 1.0)]);
        }
        if top > 0.0 {
            mesh.add_face_with_uvs(b0, t1, t0, [uv(u0, 0.0), uv(u1, 1.0), uv(u0, 1.0)]);
        }
    }

    for (radius, y, facing_up) in [(bottom, 0.0, false), (top, height, true)] {
        if radius <= 0.0 {
            continue;
        }
        let center = mesh.add_vertex(Point3::new(0.0, y, 0.0));
        let first = mesh.vertex_count() as u32;
        for i in 0..=segments {
            mesh.add_vertex(ring(radius, y, i));
        }
        let cap_uv = |i: u32| {
            let theta = TAU * i as f64 / segments as f64;
            uv(0.5 + 0.5 * theta.sin(), 0.5 + 0.5 * theta.cos())
        };
        for i in 0..segments as u32 {
            let (a, b) = (first + i, first + i + 1);
            if facing_up {
                mesh.add_face_with_uvs(center, a, b, [uv(0.5, 0.5), cap_uv(i), cap_uv(i + 1)]);
            } else {
                mesh.add_face_with_uvs(center, b, a, [uv(0.5, 0.5), cap_uv(i + 1), cap_uv(i)]);
            }
        }
    }

    mesh
}

/// Semi-angle in degrees, from `semiAngle` or the legacy `semi-angle`
fn semi_angle(entity: &Value) -> Result<f64> {
    let angle = match parse::opt_number(entity, "semiAngle")? {
        Some(angle) => angle,
        None => parse::opt_number(entity, "semi-angle")?
            .ok_or_else(|| GeometryError::MissingProperty("semiAngle".into()))?,
    };
    if angle <= 0.0 || angle >= 90.0 {
        return Err(GeometryError::invalid(
            "semiAngle",
            format!("must be between 0 and 90 degrees exclusive, got {}", angle),
        ));
    }
    Ok(angle)
}

pub fn cone(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let radius = parse::number(entity, "radius")?;
    if radius < 0.0 {
        return Err(GeometryError::invalid("radius", "must be >= 0"));
    }
    let height = parse::positive(entity, "height")?;
    let top = height * semi_angle(entity)?.to_radians().tan();
    if radius == 0.0 && top == 0.0 {
        return Err(GeometryError::Degenerate("cone has no radius".into()));
    }
    finish_object(entity, "cone", Geometry::Indexed(frustum(radius, top, height)), material, Frame::YUp)
}

pub fn cylinder(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let radius = parse::positive(entity, "radius")?;
    let height = parse::positive(entity, "height")?;
    finish_object(
        entity,
        "cylinder",
        Geometry::Indexed(frustum(radius, radius, height)),
        material,
        Frame::YUp,
    )
}

pub fn sphere(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let radius = parse::positive(entity, "radius")?;
    let (width, height) = (SPHERE_WIDTH_SEGMENTS, SPHERE_HEIGHT_SEGMENTS);
    let mut mesh = IndexedGeometry::with_capacity((width + 1) * (height + 1), width * height * 2);
    let mut uvs = Vec::with_capacity((width + 1) * (height + 1));

    for iy in 0..=height {
        let v = iy as f64 / height as f64;
        let phi = v * PI;
        for ix in 0..=width {
            let u = ix as f64 / width as f64;
            let theta = u * TAU;
            mesh.add_vertex(Point3::new(
                -radius * theta.cos() * phi.sin(),
                radius * phi.cos(),
                radius * theta.sin() * phi.sin(),
            ));
            uvs.push(uv(u, 1.0 - v));
        }
    }

    let row = (width + 1) as u32;
    for iy in 0..height as u32 {
        for ix in 0..width as u32 {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            let t = |k: u32| uvs[k as usize];
            // pole rows collapse to triangles
            if iy != 0 {
                mesh.add_face_with_uvs(a, b, d, [t(a), t(b), t(d)]);
            }
            if iy != height as u32 - 1 {
                mesh.add_face_with_uvs(b, c, d, [t(b), t(c), t(d)]);
            }
        }
    }

    finish_object(entity, "sphere", Geometry::Indexed(mesh), material, Frame::YUp)
}

pub fn torus(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let major = parse::positive(entity, "majorRadius")?;
    let minor = parse::positive(entity, "minorRadius")?;
    let (radial, tubular) = (TORUS_RADIAL_SEGMENTS, TORUS_TUBULAR_SEGMENTS);
    let mut mesh = IndexedGeometry::with_capacity((radial + 1) * (tubular + 1), radial * tubular * 2);
    let mut uvs = Vec::with_capacity((radial + 1) * (tubular + 1));

    for j in 0..=radial {
        let v = j as f64 / radial as f64 * TAU;
        for i in 0..=tubular {
            let u = i as f64 / tubular as f64 * TAU;
            mesh.add_vertex(Point3::new(
                (major + minor * v.cos()) * u.cos(),
                (major + minor * v.cos()) * u.sin(),
                minor * v.sin(),
            ));
            uvs.push(uv(i as f64 / tubular as f64, j as f64 / radial as f64));
        }
    }

    let row = (tubular + 1) as u32;
    for j in 1..=radial as u32 {
        for i in 1..=tubular as u32 {
            let a = row * j + i - 1;
            let b = row * (j - 1) + i - 1;
            let c = row * (j - 1) + i;
            let d = row * j + i;
            let t = |k: u32| uvs[k as usize];
            mesh.add_face_with_uvs(a, b, d, [t(a), t(b), t(d)]);
            mesh.add_face_with_uvs(b, c, d, [t(b), t(c), t(d)]);
        }
    }

    finish_object(entity, "torus", Geometry::Indexed(mesh), material, Frame::ZUp)
}

/// Box centered on its origin
pub fn block(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let dimensions = parse::numbers(entity, "dimensions")?;
    let [dx, dy, dz] = dimensions[..] else {
        return Err(GeometryError::invalid("dimensions", "expected [x, y, z]"));
    };
    if dx <= 0.0 || dy <= 0.0 || dz <= 0.0 {
        return Err(GeometryError::invalid("dimensions", "must be > 0"));
    }
    let half = Vector3::new(dx, dy, dz) / 2.0;

    // (normal, u, v) with u x v = normal
    let sides = [
        (Vector3::x(), Vector3::y(), Vector3::z()),
        (-Vector3::x(), Vector3::z(), Vector3::y()),
        (Vector3::y(), Vector3::z(), Vector3::x()),
        (-Vector3::y(), Vector3::x(), Vector3::z()),
        (Vector3::z(), Vector3::x(), Vector3::y()),
        (-Vector3::z(), Vector3::y(), Vector3::x()),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let corner_uvs = [uv(0.0, 0.0), uv(1.0, 0.0), uv(1.0, 1.0), uv(0.0, 1.0)];

    let mut mesh = IndexedGeometry::with_capacity(24, 12);
    for (normal, u, v) in sides {
        let first = mesh.vertex_count() as u32;
        for (su, sv) in corners {
            mesh.add_vertex(Point3::from((normal + u * su + v * sv).component_mul(&half)));
        }
        mesh.add_face_with_uvs(first, first + 1, first + 2, [corner_uvs[0], corner_uvs[1], corner_uvs[2]]);
        mesh.add_face_with_uvs(first, first + 2, first + 3, [corner_uvs[0], corner_uvs[2], corner_uvs[3]]);
    }

    finish_object(entity, "block", Geometry::Indexed(mesh), material, Frame::ZUp)
}

fn face_indices(face: &Value, vertex_count: usize) -> Result<FaceIndices> {
    let items = face
        .as_array()
        .ok_or_else(|| GeometryError::invalid("faces", "each face must be an array of vertex indices"))?;
    if items.len() < 3 {
        return Err(GeometryError::invalid("faces", "a face needs at least 3 vertices"));
    }
    items
        .iter()
        .map(|index| {
            index
                .as_u64()
                .filter(|&i| (i as usize) < vertex_count)
                .map(|i| i as u32)
                .ok_or_else(|| {
                    GeometryError::invalid(
                        "faces",
                        format!("index {} is not a vertex index below {}", index, vertex_count),
                    )
                })
        })
        .collect()
}

/// Indexed mesh from `vertices` and polygonal `faces`, fan-triangulated
pub(crate) fn polygon_mesh(entity: &Value) -> Result<IndexedGeometry> {
    let vertices = parse::points(entity, "vertices")?;
    if vertices.is_empty() {
        return Err(GeometryError::Degenerate("mesh has no vertices".into()));
    }
    let faces = entity
        .get("faces")
        .and_then(Value::as_array)
        .ok_or_else(|| GeometryError::MissingProperty("faces".into()))?;

    let mut mesh = IndexedGeometry::with_capacity(vertices.len(), faces.len() * 2);
    for v in &vertices {
        mesh.add_vertex(*v);
    }
    for face in faces {
        let indices = face_indices(face, vertices.len())?;
        for k in 1..indices.len() - 1 {
            mesh.add_face(indices[0], indices[k], indices[k + 1]);
        }
    }
    Ok(mesh)
}

pub fn mesh(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    finish_object(entity, "mesh", Geometry::Indexed(polygon_mesh(entity)?), material, Frame::ZUp)
}

/// Brep already tessellated into inline faces and vertices
pub fn brep(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    finish_object(entity, "brep", Geometry::Indexed(polygon_mesh(entity)?), material, Frame::ZUp)
}
