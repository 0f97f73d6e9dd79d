// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire primitives, drawn as poly-lines with a line material

use super::BuildContext;
use crate::material::Material;
use crate::mesh::{Geometry, LineGeometry, SceneObject};
use crate::nurbs::NurbsCurve;
use crate::pool::VectorPool;
use crate::transform::{finish_object, look_at, Frame};
use crate::{parse, GeometryError, Point3, Result, Vector3, TOLERANCE};
use nalgebra::{Rotation3, Unit};
use serde_json::Value;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

/// Angular resolution target for arcs and closed conics
pub const SEGMENTS_PER_TURN: f64 = 42.0;

/// Axis pairs tried, in order, when solving for the bisector intersection
const AXIS_PAIRS: [(usize, usize); 6] = [(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)];

#[inline]
fn lines(entity: &Value, name: &str, points: Vec<Point3<f64>>, material: Arc<Material>) -> Result<SceneObject> {
    finish_object(
        entity,
        name,
        Geometry::Lines(LineGeometry::new(points)),
        material,
        Frame::ZUp,
    )
}

pub fn line(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let start = parse::point(entity, "start")?;
    let end = parse::point(entity, "end")?;
    lines(entity, "line", vec![start, end], material)
}

pub fn polyline(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let points = parse::points(entity, "points")?;
    if points.len() < 2 {
        return Err(GeometryError::invalid("points", "a polyline needs at least 2 points"));
    }
    lines(entity, "polyline", points, material)
}

/// Closed conic in the XY plane, `x_radius` along X
fn conic(x_radius: f64, y_radius: f64) -> Vec<Point3<f64>> {
    let segments = SEGMENTS_PER_TURN as usize;
    (0..=segments)
        .map(|i| {
            let theta = TAU * i as f64 / segments as f64;
            Point3::new(x_radius * theta.cos(), y_radius * theta.sin(), 0.0)
        })
        .collect()
}

pub fn circle(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let radius = parse::positive(entity, "radius")?;
    lines(entity, "circle", conic(radius, radius), material)
}

pub fn ellipse(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let major = parse::positive(entity, "majorRadius")?;
    let minor = parse::positive(entity, "minorRadius")?;
    lines(entity, "ellipse", conic(major, minor), material)
}

/// Closed rectangle centered on its origin
pub fn rectangle(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let dimensions = parse::numbers(entity, "dimensions")?;
    let [width, height] = dimensions[..] else {
        return Err(GeometryError::invalid("dimensions", "expected [width, height]"));
    };
    if width <= 0.0 || height <= 0.0 {
        return Err(GeometryError::invalid("dimensions", "must be > 0"));
    }
    let (x, y) = (width / 2.0, height / 2.0);
    let points = vec![
        Point3::new(-x, -y, 0.0),
        Point3::new(x, -y, 0.0),
        Point3::new(x, y, 0.0),
        Point3::new(-x, y, 0.0),
        Point3::new(-x, -y, 0.0),
    ];
    lines(entity, "rectangle", points, material)
}

pub fn arc(entity: &Value, ctx: &mut BuildContext, material: Arc<Material>) -> Result<SceneObject> {
    let start = parse::point(entity, "start")?;
    let middle = parse::point(entity, "middle")?;
    let end = parse::point(entity, "end")?;
    let points = arc_points(&start, &middle, &end, &mut ctx.pool)?;
    lines(entity, "arc", points, material)
}

/// Tessellate the circular arc through three points.
///
/// Coincident or collinear input degenerates to the straight 3-point
/// poly-line `[start, middle, end]`.
pub fn arc_points(
    start: &Point3<f64>,
    middle: &Point3<f64>,
    end: &Point3<f64>,
    pool: &mut VectorPool,
) -> Result<Vec<Point3<f64>>> {
    let straight = || vec![*start, *middle, *end];

    let ab = middle - start;
    let bc = end - middle;
    if ab.norm() < TOLERANCE || bc.norm() < TOLERANCE {
        return Ok(straight());
    }

    let ab_dir = pool.alloc_with(ab.normalize());
    let bc_dir = pool.alloc_with(bc.normalize());
    let normal = pool.get(ab_dir)?.cross(&pool.get(bc_dir)?);
    if normal.norm() < TOLERANCE {
        return Ok(straight());
    }
    let normal = Unit::new_normalize(normal);

    let Some(center) = bisector_intersection(start, middle, end, &normal, pool)? else {
        return Ok(straight());
    };

    let from_center = start - center;
    let radius = from_center.norm();
    let chord = (end - start).norm();
    let minor_angle = 2.0 * (chord / (2.0 * radius)).clamp(-1.0, 1.0).asin();

    // An acute inscribed angle at the middle point means the arc through it
    // is the major one
    let angle_abc = (start - middle).angle(&(end - middle));
    let sweep = if angle_abc < FRAC_PI_2 {
        TAU - minor_angle
    } else {
        minor_angle
    };

    // round-off must not add a step to exact fractions of a turn
    let steps = ((sweep * SEGMENTS_PER_TURN / TAU - 1e-9).ceil() as usize).max(1);
    let mut points: Vec<Point3<f64>> = (0..steps)
        .map(|i| {
            let rotation = Rotation3::from_axis_angle(&normal, sweep * i as f64 / steps as f64);
            center + rotation * from_center
        })
        .collect();
    points.push(*end);
    Ok(points)
}

/// Center of the circle through three points, from the intersection of the
/// perpendicular bisectors of `ab` and `bc`
fn bisector_intersection(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    normal: &Unit<Vector3<f64>>,
    pool: &mut VectorPool,
) -> Result<Option<Point3<f64>>> {
    let d1_key = pool.alloc_with(normal.cross(&(b - a)).normalize());
    let d2_key = pool.alloc_with(normal.cross(&(c - b)).normalize());
    let (d1, d2) = (pool.get(d1_key)?, pool.get(d2_key)?);

    let m1 = Point3::from((a.coords + b.coords) / 2.0);
    let m2 = Point3::from((b.coords + c.coords) / 2.0);
    let delta = m2 - m1;

    // m1 + t*d1 = m2 + s*d2, solved for s by substituting t from axis i
    // into axis j
    for (i, j) in AXIS_PAIRS {
        if d1[i].abs() < 1e-9 {
            continue;
        }
        let ratio = d1[j] / d1[i];
        let coefficient = d2[i] * ratio - d2[j];
        if coefficient.abs() < 1e-9 {
            continue;
        }
        let s = (delta[j] - delta[i] * ratio) / coefficient;
        return Ok(Some(m2 + d2 * s));
    }
    Ok(None)
}

pub fn curve(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let curve = NurbsCurve::new(
        parse::count(entity, "degree")?,
        parse::points(entity, "controlPoints")?,
        parse::numbers(entity, "knots")?,
        parse::opt_numbers(entity, "weights")?,
    )?;
    lines(entity, "curve", curve.tessellate(), material)
}

/// Arrow glyph along `coords`: shaft, four barbs and the ring joining them
pub fn vector(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let direction = parse::point(entity, "coords")?.coords;
    let length = direction.norm();
    if length < TOLERANCE {
        return Err(GeometryError::Degenerate("vector has zero length".into()));
    }

    let head = length * 0.2;
    let barb = length * 0.05;
    let tip = Point3::new(0.0, 0.0, length);
    let base = length - head;
    let barbs = [
        Point3::new(barb, 0.0, base),
        Point3::new(0.0, barb, base),
        Point3::new(-barb, 0.0, base),
        Point3::new(0.0, -barb, base),
    ];
    let mut arrow = LineGeometry::new(vec![
        Point3::origin(),
        tip,
        barbs[0],
        tip,
        barbs[1],
        tip,
        barbs[2],
        tip,
        barbs[3],
        barbs[0],
        barbs[1],
        barbs[2],
        barbs[3],
    ]);
    arrow.transform(&look_at(&direction)?);

    finish_object(entity, "vector", Geometry::Lines(arrow), material, Frame::ZUp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::create_material;
    use approx::assert_relative_eq;
    use flux_lite_core::MaterialKind;
    use serde_json::{json, Map};

    fn line_material() -> Arc<Material> {
        Arc::new(create_material(MaterialKind::Line, &Map::new(), None))
    }

    fn line_points(object: &SceneObject) -> &[Point3<f64>] {
        match &object.geometry {
            Geometry::Lines(l) => &l.points,
            other => panic!("expected lines, got {:?}", other),
        }
    }

    #[test]
    fn test_semicircle_arc() {
        let mut pool = VectorPool::new();
        let points = arc_points(
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(-1.0, 0.0, 0.0),
            &mut pool,
        )
        .unwrap();
        assert_eq!(points.len(), 22);
        for p in &points {
            assert_relative_eq!(p.coords.norm(), 1.0, epsilon = 1e-9);
            assert!(p.y >= -1e-9);
        }
        assert_relative_eq!(points[21], Point3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_major_arc() {
        let mut pool = VectorPool::new();
        // Middle point on the far side makes a three-quarter turn
        let points = arc_points(
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(-1.0, 0.0, 0.0),
            &Point3::new(0.0, -1.0, 0.0),
            &mut pool,
        )
        .unwrap();
        assert_eq!(points.len(), 33);
        assert!(points.iter().any(|p| p.y > 0.99));
    }

    #[test]
    fn test_arc_in_vertical_plane() {
        let mut pool = VectorPool::new();
        let points = arc_points(
            &Point3::new(0.0, 2.0, 0.0),
            &Point3::new(0.0, 0.0, 2.0),
            &Point3::new(0.0, -2.0, 0.0),
            &mut pool,
        )
        .unwrap();
        for p in &points {
            assert_relative_eq!(p.x, 0.0, epsilon = 1e-9);
            assert_relative_eq!(p.coords.norm(), 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_degenerate_arc_is_straight() {
        let mut pool = VectorPool::new();
        let a = Point3::new(0.0, 0.0, 0.0);
        let c = Point3::new(2.0, 0.0, 0.0);
        let coincident = arc_points(&a, &a, &c, &mut pool).unwrap();
        assert_eq!(coincident, vec![a, a, c]);

        let near = Point3::new(1e-8, 0.0, 0.0);
        assert_eq!(arc_points(&a, &near, &c, &mut pool).unwrap().len(), 3);

        let collinear = arc_points(&a, &Point3::new(1.0, 0.0, 0.0), &c, &mut pool).unwrap();
        assert_eq!(collinear.len(), 3);
        // nothing beyond the two direction vectors was drawn from the pool
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_circle_is_closed() {
        let entity = json!({"origin": [0, 0, 5], "radius": 2});
        let object = circle(&entity, line_material()).unwrap();
        let points = line_points(&object);
        assert_eq!(points.len(), 43);
        assert_relative_eq!(points[0], points[42], epsilon = 1e-12);
        assert_relative_eq!(
            object.transform.transform_point(&points[0]),
            Point3::new(2.0, 0.0, 5.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rectangle_dimensions() {
        let entity = json!({"origin": [0, 0, 0], "dimensions": [4, 2]});
        let object = rectangle(&entity, line_material()).unwrap();
        let Geometry::Lines(l) = &object.geometry else { panic!("expected lines") };
        assert_relative_eq!(l.length(), 12.0, epsilon = 1e-12);
        assert!(rectangle(&json!({"dimensions": [1, 2, 3]}), line_material()).is_err());
    }

    #[test]
    fn test_vector_arrow() {
        let entity = json!({"coords": [0, 3, 0]});
        let object = vector(&entity, line_material()).unwrap();
        let points = line_points(&object);
        assert_eq!(points.len(), 13);
        assert_relative_eq!(points[1], Point3::new(0.0, 3.0, 0.0), epsilon = 1e-12);

        let zero = json!({"coords": [0, 0, 0]});
        assert!(matches!(vector(&zero, line_material()), Err(GeometryError::Degenerate(_))));
    }

    #[test]
    fn test_curve_knot_mismatch() {
        let entity = json!({
            "degree": 2,
            "controlPoints": [[0, 0, 0], [1, 1, 0], [2, 0, 0]],
            "knots": [0, 0, 0, 1, 1]
        });
        assert!(matches!(curve(&entity, line_material()), Err(GeometryError::InvalidKnots(_))));
    }

    #[test]
    fn test_polyline_needs_two_points() {
        assert!(polyline(&json!({"points": [[0, 0, 0]]}), line_material()).is_err());
        let ok = polyline(&json!({"points": [[0, 0, 0], [1, 0, 0]]}), line_material()).unwrap();
        assert_eq!(line_points(&ok).len(), 2);
    }
}
