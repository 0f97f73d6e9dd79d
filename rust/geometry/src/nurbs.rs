// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! NURBS curve and surface evaluation and tessellation

use crate::mesh::IndexedGeometry;
use crate::{GeometryError, Point2, Point3, Result, Vector3};

/// Curvature below which a surface is drawn as a single quad
pub const FLATNESS_THRESHOLD: f64 = 1.0 / 180.0;

/// Subdivisions per hull span at maximum curvature
pub const CURVATURE_SUBDIVISIONS: f64 = 24.0;

/// Check the NURBS relation `knots = control points + degree + 1`
pub fn check_knots(knots: &[f64], control_count: usize, degree: usize, property: &str) -> Result<()> {
    let expected = control_count + degree + 1;
    if knots.len() != expected {
        return Err(GeometryError::InvalidKnots(format!(
            "{} has {} values, expected {} ({} control points + degree {} + 1)",
            property,
            knots.len(),
            expected,
            control_count,
            degree
        )));
    }
    Ok(())
}

/// Knot span `i` with `knots[i] <= u < knots[i + 1]`, searched over the
/// spans that carry a full set of basis functions
pub fn find_span(count: usize, degree: usize, u: f64, knots: &[f64]) -> usize {
    let last = count.max(degree + 1) - 1;
    (degree..=last)
        .rev()
        .find(|&i| i + 1 < knots.len() && knots[i] <= u && knots[i] < knots[i + 1])
        .unwrap_or(degree)
}

/// The `degree + 1` basis functions that are non-zero on `span`, evaluated
/// at `u` by filling one triangular table row per degree
pub fn basis_functions(span: usize, degree: usize, u: f64, knots: &[f64]) -> Vec<f64> {
    let knot = |i: usize| knots.get(i).or(knots.last()).copied().unwrap_or(0.0);
    let mut values = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    values[0] = 1.0;

    for j in 1..=degree {
        left[j] = u - knot(span + 1 - j);
        right[j] = knot(span + j) - u;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom.abs() < 1e-14 { 0.0 } else { values[r] / denom };
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }
    values
}

/// Non-zero basis values at `u` and the index of the first control point
/// they weight
#[inline]
fn basis_at(count: usize, degree: usize, u: f64, knots: &[f64]) -> (usize, Vec<f64>) {
    let span = find_span(count, degree, u, knots);
    (span - degree, basis_functions(span, degree, u, knots))
}

/// Parameter at `t` in `[0, 1]` across the valid domain, clamped slightly
/// inside the end so the half-open basis stays non-zero
#[inline]
fn parameter(t: f64, min: f64, max: f64) -> f64 {
    let u = min + (max - min) * t;
    u.min(max - (max - min) * 1e-9).max(min)
}

/// Accumulate a weighted point; falls back to the unweighted sum when the
/// weights cancel out
fn rational(sum: Vector3<f64>, weight_sum: f64, plain: Vector3<f64>) -> Point3<f64> {
    if weight_sum.abs() > 1e-12 {
        Point3::from(sum / weight_sum)
    } else {
        Point3::from(plain)
    }
}

/// Rational B-spline curve
#[derive(Debug, Clone)]
pub struct NurbsCurve {
    pub degree: usize,
    pub control_points: Vec<Point3<f64>>,
    pub knots: Vec<f64>,
    pub weights: Option<Vec<f64>>,
}

impl NurbsCurve {
    pub fn new(
        degree: usize,
        control_points: Vec<Point3<f64>>,
        knots: Vec<f64>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self> {
        check_knots(&knots, control_points.len(), degree, "knots")?;
        if let Some(w) = &weights {
            if w.len() != control_points.len() {
                return Err(GeometryError::invalid(
                    "weights",
                    format!("expected {} weights, got {}", control_points.len(), w.len()),
                ));
            }
        }
        Ok(Self {
            degree,
            control_points,
            knots,
            weights,
        })
    }

    /// `(start, end)` of the valid parameter range
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.control_points.len()])
    }

    /// Number of tessellation points
    pub fn point_count(&self) -> usize {
        let n = self.control_points.len();
        let scaled = (n as f64 * self.degree as f64 * 2.5).floor() as usize;
        scaled.max(n.saturating_sub(1))
    }

    pub fn point_at(&self, u: f64) -> Point3<f64> {
        let mut sum = Vector3::zeros();
        let mut plain = Vector3::zeros();
        let mut weight_sum = 0.0;
        let (first, values) = basis_at(self.control_points.len(), self.degree, u, &self.knots);
        for (r, &n) in values.iter().enumerate() {
            let i = first + r;
            let Some(cp) = self.control_points.get(i) else {
                continue;
            };
            let w = self.weights.as_ref().and_then(|w| w.get(i)).copied().unwrap_or(1.0);
            sum += cp.coords * (n * w);
            plain += cp.coords * n;
            weight_sum += n * w;
        }
        rational(sum, weight_sum, plain)
    }

    /// Points along the curve; degree <= 1 (or an empty domain) yields the
    /// control polygon itself
    pub fn tessellate(&self) -> Vec<Point3<f64>> {
        let (min, max) = self.domain();
        if self.degree <= 1 || max <= min {
            return self.control_points.clone();
        }

        let count = self.point_count().max(2);
        (0..count)
            .map(|i| self.point_at(parameter(i as f64 / (count - 1) as f64, min, max)))
            .collect()
    }
}

/// Rational B-spline surface over a rectangular control grid.
/// `control_points[i][j]` runs along u with `i` and along v with `j`.
#[derive(Debug, Clone)]
pub struct NurbsSurface {
    pub u_degree: usize,
    pub v_degree: usize,
    pub control_points: Vec<Vec<Point3<f64>>>,
    pub u_knots: Vec<f64>,
    pub v_knots: Vec<f64>,
    pub weights: Option<Vec<Vec<f64>>>,
}

impl NurbsSurface {
    pub fn new(
        u_degree: usize,
        v_degree: usize,
        control_points: Vec<Vec<Point3<f64>>>,
        u_knots: Vec<f64>,
        v_knots: Vec<f64>,
        weights: Option<Vec<Vec<f64>>>,
    ) -> Result<Self> {
        let u_count = control_points.len();
        let v_count = control_points.first().map_or(0, Vec::len);
        if u_count == 0 || v_count == 0 {
            return Err(GeometryError::invalid("controlPoints", "control grid is empty"));
        }
        if control_points.iter().any(|row| row.len() != v_count) {
            return Err(GeometryError::invalid("controlPoints", "control grid is not rectangular"));
        }
        check_knots(&u_knots, u_count, u_degree, "uKnots")?;
        check_knots(&v_knots, v_count, v_degree, "vKnots")?;
        if let Some(w) = &weights {
            if w.len() != u_count || w.iter().any(|row| row.len() != v_count) {
                return Err(GeometryError::invalid("weights", "must match the control grid shape"));
            }
        }
        Ok(Self {
            u_degree,
            v_degree,
            control_points,
            u_knots,
            v_knots,
            weights,
        })
    }

    #[inline]
    fn u_count(&self) -> usize {
        self.control_points.len()
    }

    #[inline]
    fn v_count(&self) -> usize {
        self.control_points[0].len()
    }

    pub fn u_domain(&self) -> (f64, f64) {
        (self.u_knots[self.u_degree], self.u_knots[self.u_count()])
    }

    pub fn v_domain(&self) -> (f64, f64) {
        (self.v_knots[self.v_degree], self.v_knots[self.v_count()])
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point3<f64> {
        let mut sum = Vector3::zeros();
        let mut plain = Vector3::zeros();
        let mut weight_sum = 0.0;

        let (first_u, u_values) = basis_at(self.u_count(), self.u_degree, u, &self.u_knots);
        let (first_v, v_values) = basis_at(self.v_count(), self.v_degree, v, &self.v_knots);
        for (r, &n_u) in u_values.iter().enumerate() {
            let i = first_u + r;
            let Some(row) = self.control_points.get(i) else {
                continue;
            };
            for (c, &n_v) in v_values.iter().enumerate() {
                let j = first_v + c;
                let Some(cp) = row.get(j) else {
                    continue;
                };
                let n = n_u * n_v;
                let w = self
                    .weights
                    .as_ref()
                    .and_then(|w| w.get(i))
                    .and_then(|row| row.get(j))
                    .copied()
                    .unwrap_or(1.0);
                sum += cp.coords * (n * w);
                plain += cp.coords * n;
                weight_sum += n * w;
            }
        }
        rational(sum, weight_sum, plain)
    }

    /// Minimal resolution: one span per control hull edge
    pub fn hull_resolution(&self) -> (usize, usize) {
        ((self.u_count() - 1).max(1), (self.v_count() - 1).max(1))
    }

    /// Maximum angle between normals of control-hull triangles sharing a
    /// vertex, normalized by pi into `[0, 1]`
    pub fn curvature(&self) -> f64 {
        let (u_count, v_count) = (self.u_count(), self.v_count());
        if u_count < 2 || v_count < 2 {
            return 0.0;
        }

        let mut vertex_normals: Vec<Vec<Vector3<f64>>> = vec![Vec::new(); u_count * v_count];
        for i in 0..u_count - 1 {
            for j in 0..v_count - 1 {
                let base = i * v_count + j;
                let next_u = base + v_count;
                for tri in [[base, base + 1, next_u + 1], [base, next_u + 1, next_u]] {
                    let [a, b, c] = tri.map(|k| self.control_points[k / v_count][k % v_count]);
                    let cross = (b - a).cross(&(c - a));
                    if cross.norm() < 1e-12 {
                        continue;
                    }
                    let normal = cross.normalize();
                    for k in tri {
                        vertex_normals[k].push(normal);
                    }
                }
            }
        }

        let mut max_angle: f64 = 0.0;
        for normals in &vertex_normals {
            for (a, n1) in normals.iter().enumerate() {
                for n2 in &normals[a + 1..] {
                    max_angle = max_angle.max(n1.dot(n2).clamp(-1.0, 1.0).acos());
                }
            }
        }
        max_angle / std::f64::consts::PI
    }

    /// Curvature-adaptive `(slices, stacks)`
    pub fn resolution(&self) -> (usize, usize) {
        let curvature = self.curvature();
        if curvature < FLATNESS_THRESHOLD {
            return (1, 1);
        }
        let (hull_u, hull_v) = self.hull_resolution();
        let scale = |hull: usize| {
            let scaled = (hull as f64 * curvature * CURVATURE_SUBDIVISIONS).ceil() as usize;
            scaled.max(hull)
        };
        (scale(hull_u), scale(hull_v))
    }

    /// Evaluate on a `(slices + 1) x (stacks + 1)` grid with per-face UVs
    pub fn tessellate(&self) -> IndexedGeometry {
        let (slices, stacks) = self.resolution();
        let (u_min, u_max) = self.u_domain();
        let (v_min, v_max) = self.v_domain();

        let mut mesh = IndexedGeometry::with_capacity((slices + 1) * (stacks + 1), slices * stacks * 2);
        let mut uvs = Vec::with_capacity((slices + 1) * (stacks + 1));

        for i in 0..=slices {
            let s = i as f64 / slices as f64;
            let u = parameter(s, u_min, u_max);
            for j in 0..=stacks {
                let t = j as f64 / stacks as f64;
                let v = parameter(t, v_min, v_max);
                mesh.add_vertex(self.point_at(u, v));
                uvs.push(Point2::new(s, t));
            }
        }

        let row = (stacks + 1) as u32;
        for i in 0..slices as u32 {
            for j in 0..stacks as u32 {
                let base = i * row + j;
                let next_u = base + row;
                let quad = [base, base + 1, next_u + 1, next_u];
                let uv = quad.map(|k| uvs[k as usize]);
                mesh.add_face_with_uvs(quad[0], quad[1], quad[2], [uv[0], uv[1], uv[2]]);
                mesh.add_face_with_uvs(quad[0], quad[2], quad[3], [uv[0], uv[2], uv[3]]);
            }
        }

        mesh
    }
}
