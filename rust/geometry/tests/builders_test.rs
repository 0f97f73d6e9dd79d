// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builder behavior through the public dispatch entry point.

use approx::assert_relative_eq;
use flux_lite_core::{MaterialKind, PrimitiveKind};
use flux_lite_geometry::{
    build, create_material, BuildContext, Geometry, GeometryError, Material, MaterialCache, PlaneBasis, Point3,
    VectorPool,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn material_for(kind: PrimitiveKind) -> Arc<Material> {
    Arc::new(create_material(kind.material_kind(), &Map::new(), None))
}

fn build_entity(entity: &Value) -> Result<flux_lite_geometry::SceneObject, GeometryError> {
    let name = entity["primitive"].as_str().unwrap_or_default();
    let kind = PrimitiveKind::from_name(name).expect("known primitive");
    let mut ctx = BuildContext::new();
    build(kind, entity, &mut ctx, material_for(kind))
}

#[test]
fn test_planar_round_trip() {
    // points on the tilted plane x + 2y - z = 3
    let points: Vec<Point3<f64>> = [(0.0, 0.0), (4.0, 1.0), (3.0, 5.0), (-2.0, 3.5), (-1.0, 0.5)]
        .iter()
        .map(|&(x, y)| Point3::new(x, y, x + 2.0 * y - 3.0))
        .collect();

    let mut pool = VectorPool::new();
    let basis = PlaneBasis::from_points(&points, &mut pool).unwrap();
    basis.check_planar(&points, 0).unwrap();
    for p in &points {
        let restored = basis.restore(&basis.project(p));
        assert_relative_eq!(restored, *p, epsilon = 1e-9);
    }
}

#[test]
fn test_arc_degeneracy_never_fails() {
    for (start, middle, end) in [
        ([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]),
        ([5.0, 5.0, 5.0], [5.0, 5.0, 5.0 + 1e-7], [6.0, 5.0, 5.0]),
    ] {
        let entity = json!({"primitive": "arc", "start": start, "middle": middle, "end": end});
        let object = build_entity(&entity).unwrap();
        match object.geometry {
            Geometry::Lines(line) => assert_eq!(line.points.len(), 3),
            other => panic!("expected lines, got {:?}", other),
        }
    }
}

#[test]
fn test_curve_knot_count_contract() {
    for n in 2..6usize {
        for degree in 1..4usize {
            for k in (n + degree - 1)..=(n + degree + 3) {
                let control_points: Vec<[f64; 3]> = (0..n).map(|i| [i as f64, (i % 2) as f64, 0.0]).collect();
                let knots: Vec<f64> = (0..k).map(|i| i as f64).collect();
                let entity = json!({
                    "primitive": "curve",
                    "degree": degree,
                    "controlPoints": control_points,
                    "knots": knots
                });
                let result = build_entity(&entity);
                if k == n + degree + 1 {
                    assert!(result.is_ok(), "n={} d={} k={}: {:?}", n, degree, k, result.err());
                } else {
                    assert!(
                        matches!(result, Err(GeometryError::InvalidKnots(_))),
                        "n={} d={} k={} should fail",
                        n,
                        degree,
                        k
                    );
                }
            }
        }
    }
}

#[test]
fn test_cone_angle_bounds() {
    for (angle, ok) in [(0.0, false), (0.5, true), (45.0, true), (89.9, true), (90.0, false)] {
        let entity = json!({
            "primitive": "cone",
            "origin": [0, 0, 0],
            "radius": 1,
            "height": 1,
            "semiAngle": angle
        });
        assert_eq!(build_entity(&entity).is_ok(), ok, "semiAngle {}", angle);
    }
}

#[test]
fn test_color_moves_to_geometry() {
    let mut cache = MaterialCache::new();
    let mut ctx = BuildContext::new();
    let mut objects = Vec::new();
    for color in ["#ff0000", "#00ff00"] {
        let entity = json!({
            "primitive": "block",
            "origin": [0, 0, 0],
            "dimensions": [1, 1, 1],
            "materialProperties": {"color": color, "opacity": 1}
        });
        let material = cache.resolve(MaterialKind::Phong, &flux_lite_core::entity::material_properties(&entity));
        objects.push(build(PrimitiveKind::Block, &entity, &mut ctx, material).unwrap());
    }

    assert!(Arc::ptr_eq(&objects[0].material, &objects[1].material));
    assert_eq!(objects[0].geometry.uniform_color(), Some([1.0, 0.0, 0.0]));
    assert_eq!(objects[1].geometry.uniform_color(), Some([0.0, 1.0, 0.0]));
}

#[test]
fn test_block_orientation() {
    let entity = json!({
        "primitive": "block",
        "origin": [10, 0, 0],
        "dimensions": [2, 2, 4],
        "axis": [1, 0, 0]
    });
    let object = build_entity(&entity).unwrap();
    let top = object.transform.transform_point(&Point3::new(0.0, 0.0, 2.0));
    assert_relative_eq!(top, Point3::new(12.0, 0.0, 0.0), epsilon = 1e-12);
}

#[test]
fn test_non_planar_polygon_set_is_an_error() {
    let entity = json!({
        "primitive": "polygonSet",
        "polygons": [{"boundary": [[0, 0, 0], [1, 0, 0], [1, 1, 1e-3], [0, 1, 0]]}]
    });
    assert!(matches!(build_entity(&entity), Err(GeometryError::NonPlanar { .. })));
}
