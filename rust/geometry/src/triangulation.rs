// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Planar 3D polygons are reduced to 2D with a [`PlaneBasis`], triangulated
//! with earcutr and restored to 3D with the same basis.

use crate::pool::VectorPool;
use crate::{GeometryError, Point2, Point3, Result, Vector3, TOLERANCE};

/// Unnormalized area vector of a closed loop (Newell's method).
/// Its direction tells which side the loop winds counter-clockwise around.
fn winding_vector(loop_points: &[Point3<f64>]) -> Vector3<f64> {
    loop_points
        .iter()
        .zip(loop_points.iter().cycle().skip(1))
        .fold(Vector3::zeros(), |acc, (a, b)| acc + a.coords.cross(&b.coords))
}

/// Earcut a projected boundary and its holes as one flat ring list.
/// Indices address the boundary followed by each hole in order.
fn earcut_rings(boundary: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<Vec<usize>> {
    if boundary.len() < 3 {
        return Err(GeometryError::Triangulation(format!(
            "boundary has {} points, at least 3 required",
            boundary.len()
        )));
    }
    if let Some(i) = holes.iter().position(|h| h.len() < 3) {
        return Err(GeometryError::Triangulation(format!(
            "hole {} has fewer than 3 points",
            i
        )));
    }

    let mut coords: Vec<f64> = boundary.iter().flat_map(|p| [p.x, p.y]).collect();
    let mut hole_starts = Vec::with_capacity(holes.len());
    for hole in holes {
        hole_starts.push(coords.len() / 2);
        coords.extend(hole.iter().flat_map(|p| [p.x, p.y]));
    }

    earcutr::earcut(&coords, &hole_starts, 2).map_err(|e| GeometryError::Triangulation(format!("{:?}", e)))
}

/// Orthonormal frame of a plane: origin, normal and two in-plane axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneBasis {
    pub origin: Point3<f64>,
    pub normal: Vector3<f64>,
    pub u_axis: Vector3<f64>,
    pub v_axis: Vector3<f64>,
}

impl PlaneBasis {
    /// Derive a basis from the first three non-collinear points.
    ///
    /// The basis is flipped if needed so that the polygon winds
    /// counter-clockwise around its normal.
    pub fn from_points(points: &[Point3<f64>], pool: &mut VectorPool) -> Result<Self> {
        let origin = *points
            .first()
            .ok_or_else(|| GeometryError::Degenerate("polygon has no points".into()))?;

        let u_key = pool.alloc();
        let mut rest = points.iter().skip(1);
        for p in rest.by_ref() {
            let edge = p - origin;
            if edge.norm() > TOLERANCE {
                pool.set(u_key, edge.normalize())?;
                break;
            }
        }
        let u_axis = pool.get(u_key)?;
        if u_axis == Vector3::zeros() {
            return Err(GeometryError::Degenerate("polygon points coincide".into()));
        }

        let normal_key = pool.alloc();
        for p in rest {
            let edge = p - origin;
            if edge.norm() <= TOLERANCE {
                continue;
            }
            let cross = u_axis.cross(&edge.normalize());
            if cross.norm() > TOLERANCE {
                pool.set(normal_key, cross.normalize())?;
                break;
            }
        }
        let mut normal = pool.get(normal_key)?;
        if normal == Vector3::zeros() {
            return Err(GeometryError::Degenerate("polygon points are collinear".into()));
        }

        if winding_vector(points).dot(&normal) < 0.0 {
            normal = -normal;
        }
        let v_axis = normal.cross(&u_axis);

        Ok(Self {
            origin,
            normal,
            u_axis,
            v_axis,
        })
    }

    /// Signed distance of a point from the plane
    #[inline]
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.origin).dot(&self.normal)
    }

    /// Fail with the first point further than the tolerance from the plane.
    /// `first_index` offsets the reported index.
    pub fn check_planar(&self, points: &[Point3<f64>], first_index: usize) -> Result<()> {
        for (i, p) in points.iter().enumerate() {
            let distance = self.distance(p);
            if distance.abs() > TOLERANCE {
                return Err(GeometryError::NonPlanar {
                    index: first_index + i,
                    distance: distance.abs(),
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn project(&self, point: &Point3<f64>) -> Point2<f64> {
        let v = point - self.origin;
        Point2::new(v.dot(&self.u_axis), v.dot(&self.v_axis))
    }

    pub fn project_all(&self, points: &[Point3<f64>]) -> Vec<Point2<f64>> {
        points.iter().map(|p| self.project(p)).collect()
    }

    #[inline]
    pub fn restore(&self, point: &Point2<f64>) -> Point3<f64> {
        self.origin + self.u_axis * point.x + self.v_axis * point.y
    }
}

/// Triangulate a planar 3D polygon with holes.
///
/// Returns the restored 3D vertices (boundary then holes) and triangle
/// indices wound counter-clockwise around the basis normal.
pub fn triangulate_planar(
    boundary: &[Point3<f64>],
    holes: &[Vec<Point3<f64>>],
    pool: &mut VectorPool,
) -> Result<(PlaneBasis, Vec<Point3<f64>>, Vec<usize>)> {
    let basis = PlaneBasis::from_points(boundary, pool)?;
    basis.check_planar(boundary, 0)?;
    let mut offset = boundary.len();
    for hole in holes {
        basis.check_planar(hole, offset)?;
        offset += hole.len();
    }

    let outer_2d = basis.project_all(boundary);
    let holes_2d: Vec<Vec<Point2<f64>>> = holes.iter().map(|h| basis.project_all(h)).collect();
    let mut indices = earcut_rings(&outer_2d, &holes_2d)?;

    let flat: Vec<Point2<f64>> = outer_2d.into_iter().chain(holes_2d.into_iter().flatten()).collect();
    for tri in indices.chunks_exact_mut(3) {
        let (a, b, c) = (flat[tri[0]], flat[tri[1]], flat[tri[2]]);
        let area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        if area < 0.0 {
            tri.swap(1, 2);
        }
    }

    let restored = flat.iter().map(|p| basis.restore(p)).collect();
    Ok((basis, restored, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64, offset: f64, z: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(offset, offset, z),
            Point3::new(offset + size, offset, z),
            Point3::new(offset + size, offset + size, z),
            Point3::new(offset, offset + size, z),
        ]
    }

    #[test]
    fn test_winding_vector_follows_orientation() {
        let ccw = square(2.0, 0.0, 0.0);
        assert_relative_eq!(winding_vector(&ccw), Vector3::new(0.0, 0.0, 8.0), epsilon = 1e-12);
        let cw: Vec<_> = ccw.into_iter().rev().collect();
        assert!(winding_vector(&cw).z < 0.0);
    }

    #[test]
    fn test_planar_square_with_hole() {
        let mut pool = VectorPool::new();
        let boundary = square(10.0, 0.0, 2.0);
        let hole: Vec<_> = square(4.0, 3.0, 2.0).into_iter().rev().collect();
        let (basis, vertices, indices) = triangulate_planar(&boundary, &[hole], &mut pool).unwrap();

        assert_eq!(vertices.len(), 8);
        assert_eq!(indices.len(), 8 * 3);
        assert_relative_eq!(basis.normal, Vector3::z(), epsilon = 1e-12);
        for v in &vertices {
            assert_relative_eq!(v.z, 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_short_hole_is_rejected() {
        let mut pool = VectorPool::new();
        let boundary = square(10.0, 0.0, 0.0);
        let hole = vec![Point3::new(3.0, 3.0, 0.0), Point3::new(4.0, 3.0, 0.0)];
        assert!(matches!(
            triangulate_planar(&boundary, &[hole], &mut pool),
            Err(GeometryError::Triangulation(_))
        ));
    }

    #[test]
    fn test_concave_boundary() {
        let mut pool = VectorPool::new();
        // L shape
        let boundary = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let (_, _, indices) = triangulate_planar(&boundary, &[], &mut pool).unwrap();
        assert_eq!(indices.len(), 4 * 3);
    }

    #[test]
    fn test_basis_skips_collinear_points() {
        let mut pool = VectorPool::new();
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 1.0),
        ];
        let basis = PlaneBasis::from_points(&points, &mut pool).unwrap();
        assert_relative_eq!(basis.normal.y.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_basis_rejects_collinear() {
        let mut pool = VectorPool::new();
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
        ];
        assert!(matches!(
            PlaneBasis::from_points(&points, &mut pool),
            Err(GeometryError::Degenerate(_))
        ));
    }

    #[test]
    fn test_non_planar_reports_index() {
        let mut pool = VectorPool::new();
        let boundary = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.5),
        ];
        match triangulate_planar(&boundary, &[], &mut pool) {
            Err(GeometryError::NonPlanar { index, .. }) => assert_eq!(index, 3),
            other => panic!("expected non-planar error, got {:?}", other),
        }
    }

    #[test]
    fn test_triangles_face_polygon_normal() {
        let mut pool = VectorPool::new();
        // Clockwise seen from +Z, so the normal points down
        let boundary = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
        ];
        let (basis, vertices, indices) = triangulate_planar(&boundary, &[], &mut pool).unwrap();
        assert_relative_eq!(basis.normal, -Vector3::z(), epsilon = 1e-12);
        for tri in indices.chunks_exact(3) {
            let n = (vertices[tri[1]] - vertices[tri[0]]).cross(&(vertices[tri[2]] - vertices[tri[0]]));
            assert!(n.dot(&basis.normal) > 0.0);
        }
    }
}
