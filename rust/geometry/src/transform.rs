// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement of built geometry in the scene
//!
//! Generators emit geometry in a canonical local frame. The shared post-step
//! in [`finish_object`] turns Y-up generators Z-up, orients by
//! `axis`/`direction`/`normal` (with an optional `reference` x-direction),
//! translates by `origin`, applies an explicit entity `transform` and moves
//! the entity color onto the geometry.

use crate::material::{parse_color, Material};
use crate::mesh::{Geometry, SceneObject, DEFAULT_COLOR};
use crate::{parse, GeometryError, Point3, Result, Vector3, TOLERANCE};
use flux_lite_core::entity::material_properties;
use nalgebra::{Matrix4, Rotation3, Translation3};
use serde_json::Value;
use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

/// Local frame a generator builds in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Already Z-up
    ZUp,
    /// Built around +Y; rotated about X so +Y becomes +Z
    YUp,
}

/// Rotation taking the Y-up generator frame to Z-up
#[inline]
pub fn z_up() -> Matrix4<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2).to_homogeneous()
}

/// Rotation taking +Z onto `direction`
pub fn look_at(direction: &Vector3<f64>) -> Result<Matrix4<f64>> {
    let length = direction.norm();
    if length < TOLERANCE {
        return Err(GeometryError::Degenerate("direction has zero length".into()));
    }
    let target = direction / length;
    // rotation_between has no unique answer for opposite vectors
    let rotation = Rotation3::rotation_between(&Vector3::z(), &target)
        .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::x_axis(), PI));
    Ok(rotation.to_homogeneous())
}

/// Orthonormal basis with Z along `axis` and X along `reference`
/// projected onto the plane perpendicular to Z.
pub fn axis_basis(axis: &Vector3<f64>, reference: &Vector3<f64>) -> Result<Matrix4<f64>> {
    if axis.norm() < TOLERANCE {
        return Err(GeometryError::invalid("axis", "must not be zero-length"));
    }
    let z_axis = axis.normalize();

    let x_axis_orthogonal = if reference.norm() < TOLERANCE {
        Vector3::zeros()
    } else {
        let x = reference.normalize();
        x - z_axis * x.dot(&z_axis)
    };
    let x_axis = if x_axis_orthogonal.norm() > TOLERANCE {
        x_axis_orthogonal.normalize()
    } else if z_axis.z.abs() < 0.9 {
        // reference parallel to the axis: pick any perpendicular
        Vector3::z().cross(&z_axis).normalize()
    } else {
        Vector3::x().cross(&z_axis).normalize()
    };

    let y_axis = z_axis.cross(&x_axis).normalize();

    Ok(Matrix4::new(
        x_axis.x, y_axis.x, z_axis.x, 0.0,
        x_axis.y, y_axis.y, z_axis.y, 0.0,
        x_axis.z, y_axis.z, z_axis.z, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ))
}

/// First of `axis`, `direction` or `normal` present on the entity
fn orientation_axis(entity: &Value) -> Result<Option<Vector3<f64>>> {
    for key in ["axis", "direction", "normal"] {
        if let Some(axis) = parse::opt_vector(entity, key)? {
            return Ok(Some(axis));
        }
    }
    Ok(None)
}

/// Column-major affine matrix from an entity's `transform`
fn entity_transform(entity: &Value) -> Result<Option<Matrix4<f64>>> {
    match parse::opt_numbers(entity, "transform")? {
        None => Ok(None),
        Some(values) if values.len() == 16 => Ok(Some(Matrix4::from_column_slice(&values))),
        Some(values) => Err(GeometryError::invalid(
            "transform",
            format!("expected 16 numbers, got {}", values.len()),
        )),
    }
}

/// Local-to-scene transform for an entity: `transform * T(origin) * R(axis)`
pub fn placement(entity: &Value) -> Result<Matrix4<f64>> {
    let rotation = match (orientation_axis(entity)?, parse::opt_vector(entity, "reference")?) {
        (Some(axis), Some(reference)) => axis_basis(&axis, &reference)?,
        (Some(axis), None) => look_at(&axis)?,
        (None, Some(reference)) => axis_basis(&Vector3::z(), &reference)?,
        (None, None) => Matrix4::identity(),
    };

    let translation = parse::opt_point(entity, "origin")?
        .map(|o| Translation3::from(o.coords).to_homogeneous())
        .unwrap_or_else(Matrix4::identity);

    let local = translation * rotation;
    Ok(match entity_transform(entity)? {
        Some(matrix) => matrix * local,
        None => local,
    })
}

/// Color an entity asks for, falling back to the default
pub fn entity_color(entity: &Value) -> [f32; 3] {
    material_properties(entity)
        .get("color")
        .and_then(parse_color)
        .unwrap_or(DEFAULT_COLOR)
}

/// Shared post-step for every builder that emits geometry
pub fn finish_object(
    entity: &Value,
    name: &str,
    mut geometry: Geometry,
    material: Arc<Material>,
    frame: Frame,
) -> Result<SceneObject> {
    geometry.set_color(entity_color(entity));

    let mut transform = placement(entity)?;
    if frame == Frame::YUp {
        transform *= z_up();
    }

    let mut object = SceneObject::new(name, geometry, material);
    object.transform = transform;
    Ok(object)
}

/// Map a point through an affine matrix
#[inline]
pub fn apply(matrix: &Matrix4<f64>, point: &Point3<f64>) -> Point3<f64> {
    matrix.transform_point(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_z_up_maps_y_to_z() {
        let p = apply(&z_up(), &Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_look_at() {
        let m = look_at(&Vector3::new(1.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(apply(&m, &Point3::new(0.0, 0.0, 2.0)), Point3::new(2.0, 0.0, 0.0), epsilon = 1e-12);

        let down = look_at(&Vector3::new(0.0, 0.0, -3.0)).unwrap();
        assert_relative_eq!(apply(&down, &Point3::new(0.0, 0.0, 1.0)), Point3::new(0.0, 0.0, -1.0), epsilon = 1e-12);

        assert!(look_at(&Vector3::zeros()).is_err());
    }

    #[test]
    fn test_axis_basis_orthogonalizes_reference() {
        let m = axis_basis(&Vector3::z(), &Vector3::new(1.0, 0.0, 1.0)).unwrap();
        assert_relative_eq!(apply(&m, &Point3::new(1.0, 0.0, 0.0)), Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(apply(&m, &Point3::new(0.0, 1.0, 0.0)), Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_axis_basis_parallel_reference() {
        let m = axis_basis(&Vector3::z(), &Vector3::z()).unwrap();
        let x = apply(&m, &Point3::new(1.0, 0.0, 0.0)).coords;
        assert_relative_eq!(x.dot(&Vector3::z()), 0.0, epsilon = 1e-12);
        assert_relative_eq!(x.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_placement_translates_then_rotates() {
        let entity = json!({"origin": [1, 2, 3], "axis": [1, 0, 0]});
        let m = placement(&entity).unwrap();
        assert_relative_eq!(apply(&m, &Point3::new(0.0, 0.0, 1.0)), Point3::new(2.0, 2.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_placement_with_entity_transform() {
        let mut transform = vec![0.0; 16];
        for i in 0..4 {
            transform[i * 5] = 1.0;
        }
        transform[12] = 10.0;
        let entity = json!({"origin": [1, 0, 0], "transform": transform});
        let m = placement(&entity).unwrap();
        assert_relative_eq!(apply(&m, &Point3::origin()), Point3::new(11.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_bad_transform_length() {
        let entity = json!({"transform": [1, 0, 0]});
        assert!(placement(&entity).is_err());
    }

    #[test]
    fn test_entity_color() {
        let entity = json!({"attributes": {"materialProperties": {"color": [1, 0, 0]}}});
        assert_eq!(entity_color(&entity), [1.0, 0.0, 0.0]);
        assert_eq!(entity_color(&json!({})), DEFAULT_COLOR);
    }
}
