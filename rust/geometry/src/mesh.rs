// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Renderable scene data structures
//!
//! This is the boundary handed to a renderer: indexed triangle meshes (the
//! mergeable working representation), flat vertex buffers (the final
//! representation), poly-lines, point clouds and text labels, each paired
//! with a shared material and a local transform.

use crate::material::Material;
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use serde::Serialize;
use std::sync::Arc;

/// Linear RGB color, components in `[0, 1]`
pub type Color = [f32; 3];

/// Color used when neither geometry nor material specify one
pub const DEFAULT_COLOR: Color = [0.5, 0.5, 0.8];

/// Bit pattern of a color for exact equality and ordering
#[inline]
pub fn color_bits(color: &Color) -> [u32; 3] {
    [color[0].to_bits(), color[1].to_bits(), color[2].to_bits()]
}

/// Triangle referencing three vertices, carrying its own color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub color: Color,
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default)]
pub struct IndexedGeometry {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<Face>,
    /// Per-face texture coordinates, when the generator produces them
    pub face_uvs: Option<Vec<[Point2<f64>; 3]>>,
}

impl IndexedGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            face_uvs: None,
        }
    }

    /// Add a vertex, returning its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        self.vertices.push(position);
        (self.vertices.len() - 1) as u32
    }

    /// Add a triangle
    #[inline]
    pub fn add_face(&mut self, a: u32, b: u32, c: u32) {
        self.faces.push(Face {
            a,
            b,
            c,
            color: DEFAULT_COLOR,
        });
    }

    /// Add a triangle with texture coordinates
    #[inline]
    pub fn add_face_with_uvs(&mut self, a: u32, b: u32, c: u32, uvs: [Point2<f64>; 3]) {
        self.add_face(a, b, c);
        self.face_uvs.get_or_insert_with(Vec::new).push(uvs);
    }

    pub fn has_face_uvs(&self) -> bool {
        self.face_uvs.is_some()
    }

    /// Paint every face with one color
    pub fn set_color(&mut self, color: Color) {
        for face in &mut self.faces {
            face.color = color;
        }
    }

    /// The color shared by all faces, if there is exactly one
    pub fn uniform_color(&self) -> Option<Color> {
        let first = self.faces.first()?.color;
        let bits = color_bits(&first);
        self.faces
            .iter()
            .all(|f| color_bits(&f.color) == bits)
            .then_some(first)
    }

    /// Apply an affine transform to every vertex
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for v in &mut self.vertices {
            *v = matrix.transform_point(v);
        }
    }

    /// Append another mesh, mapping its vertices through `to_local` first
    pub fn merge(&mut self, other: &IndexedGeometry, to_local: &Matrix4<f64>) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = self.vertices.len() as u32;
        self.vertices.reserve(other.vertices.len());
        self.faces.reserve(other.faces.len());

        self.vertices
            .extend(other.vertices.iter().map(|v| to_local.transform_point(v)));
        self.faces.extend(other.faces.iter().map(|f| Face {
            a: f.a + vertex_offset,
            b: f.b + vertex_offset,
            c: f.c + vertex_offset,
            color: f.color,
        }));

        if let (Some(mine), Some(theirs)) = (self.face_uvs.as_mut(), other.face_uvs.as_ref()) {
            mine.extend_from_slice(theirs);
        }
    }

    /// Flatten into a non-indexed vertex buffer with flat face normals
    pub fn to_buffer(&self) -> BufferGeometry {
        let mut buffer = BufferGeometry::with_capacity(self.faces.len() * 3);
        for (i, face) in self.faces.iter().enumerate() {
            let corners = [face.a, face.b, face.c].map(|idx| {
                self.vertices
                    .get(idx as usize)
                    .copied()
                    .unwrap_or_else(Point3::origin)
            });
            let normal = face_normal(&corners[0], &corners[1], &corners[2]);
            let uvs = self.face_uvs.as_ref().and_then(|uvs| uvs.get(i));
            for (k, corner) in corners.iter().enumerate() {
                buffer.push_vertex(corner, &normal, &face.color);
                if let Some(uv) = uvs {
                    buffer.uvs.push(uv[k].x as f32);
                    buffer.uvs.push(uv[k].y as f32);
                }
            }
        }
        buffer
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Calculate bounds (min, max)
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        bounds_of(self.vertices.iter().copied())
    }
}

/// Unit normal of a triangle, `+Z` for degenerate triangles
#[inline]
pub fn face_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Vector3<f64> {
    let normal = (b - a).cross(&(c - a));
    let len = normal.norm();
    if len > 1e-12 {
        normal / len
    } else {
        Vector3::z()
    }
}

fn bounds_of(points: impl Iterator<Item = Point3<f64>>) -> (Point3<f64>, Point3<f64>) {
    let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
    let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);
    let mut any = false;
    for p in points {
        any = true;
        min = min.inf(&p);
        max = max.sup(&p);
    }
    if any {
        (min, max)
    } else {
        (Point3::origin(), Point3::origin())
    }
}

/// Flat vertex buffer (three vertices per triangle), the final mesh form
#[derive(Debug, Clone, Default)]
pub struct BufferGeometry {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Vertex colors (r, g, b)
    pub colors: Vec<f32>,
    /// Texture coordinates (u, v), empty when the source had none
    pub uvs: Vec<f32>,
}

impl BufferGeometry {
    pub fn with_capacity(vertex_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            colors: Vec::with_capacity(vertex_count * 3),
            uvs: Vec::new(),
        }
    }

    #[inline]
    fn push_vertex(&mut self, position: &Point3<f64>, normal: &Vector3<f64>, color: &Color) {
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);

        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);

        self.colors.extend_from_slice(color);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Ordered point sequence drawn as a connected poly-line
#[derive(Debug, Clone, Default)]
pub struct LineGeometry {
    pub points: Vec<Point3<f64>>,
    pub color: Color,
}

impl LineGeometry {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self {
            points,
            color: DEFAULT_COLOR,
        }
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for p in &mut self.points {
            *p = matrix.transform_point(p);
        }
    }

    /// Total length of the poly-line
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
    }
}

/// Point cloud with shared position and color buffers
#[derive(Debug, Clone, Default)]
pub struct PointGeometry {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl PointGeometry {
    pub fn push(&mut self, position: &Point3<f64>, color: &Color) {
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);
        self.colors.extend_from_slice(color);
    }

    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Text rendered by the host as a label at the object's origin
#[derive(Debug, Clone)]
pub struct LabelGeometry {
    pub text: String,
    pub size: f64,
    pub color: Color,
}

/// Geometry payload of a scene object
#[derive(Debug, Clone)]
pub enum Geometry {
    Indexed(IndexedGeometry),
    Buffer(BufferGeometry),
    Lines(LineGeometry),
    Points(PointGeometry),
    Label(LabelGeometry),
}

impl Geometry {
    #[inline]
    pub fn is_indexed(&self) -> bool {
        matches!(self, Geometry::Indexed(_))
    }

    pub fn has_face_uvs(&self) -> bool {
        match self {
            Geometry::Indexed(g) => g.has_face_uvs(),
            Geometry::Buffer(g) => !g.uvs.is_empty(),
            _ => false,
        }
    }

    /// Color the geometry carries, when uniform
    pub fn uniform_color(&self) -> Option<Color> {
        match self {
            Geometry::Indexed(g) => g.uniform_color(),
            Geometry::Lines(g) => Some(g.color),
            Geometry::Label(g) => Some(g.color),
            Geometry::Buffer(_) | Geometry::Points(_) => None,
        }
    }

    /// Move a color onto the geometry's own color channel
    pub fn set_color(&mut self, color: Color) {
        match self {
            Geometry::Indexed(g) => g.set_color(color),
            Geometry::Lines(g) => g.color = color,
            Geometry::Label(g) => g.color = color,
            Geometry::Buffer(g) => {
                for chunk in g.colors.chunks_exact_mut(3) {
                    chunk.copy_from_slice(&color);
                }
            }
            Geometry::Points(g) => {
                for chunk in g.colors.chunks_exact_mut(3) {
                    chunk.copy_from_slice(&color);
                }
            }
        }
    }

    /// Number of vertices (or points) carried
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Indexed(g) => g.vertex_count(),
            Geometry::Buffer(g) => g.vertex_count(),
            Geometry::Lines(g) => g.points.len(),
            Geometry::Points(g) => g.len(),
            Geometry::Label(_) => 0,
        }
    }

    pub fn triangle_count(&self) -> usize {
        match self {
            Geometry::Indexed(g) => g.face_count(),
            Geometry::Buffer(g) => g.triangle_count(),
            _ => 0,
        }
    }
}

/// A renderable object: geometry, shared material and local transform
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Primitive the object was built from (or "merged" group name)
    pub name: String,
    pub geometry: Geometry,
    pub material: Arc<Material>,
    /// Local-to-scene transform
    pub transform: Matrix4<f64>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, geometry: Geometry, material: Arc<Material>) -> Self {
        Self {
            name: name.into(),
            geometry,
            material,
            transform: Matrix4::identity(),
        }
    }

    #[inline]
    pub fn material_key(&self) -> &str {
        self.material.key()
    }
}

/// Summary of a scene for logging and diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneStats {
    pub objects: usize,
    pub meshes: usize,
    pub lines: usize,
    pub point_clouds: usize,
    pub labels: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub materials: usize,
}

/// Root container of a converted scene
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub children: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: SceneObject) {
        self.children.push(object);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn stats(&self) -> SceneStats {
        let mut stats = SceneStats {
            objects: self.children.len(),
            ..SceneStats::default()
        };
        let mut materials: Vec<*const Material> = Vec::new();
        for child in &self.children {
            match &child.geometry {
                Geometry::Indexed(_) | Geometry::Buffer(_) => stats.meshes += 1,
                Geometry::Lines(_) => stats.lines += 1,
                Geometry::Points(_) => stats.point_clouds += 1,
                Geometry::Label(_) => stats.labels += 1,
            }
            stats.vertices += child.geometry.vertex_count();
            stats.triangles += child.geometry.triangle_count();
            let ptr = Arc::as_ptr(&child.material);
            if !materials.contains(&ptr) {
                materials.push(ptr);
            }
        }
        stats.materials = materials.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Translation3;

    fn triangle() -> IndexedGeometry {
        let mut g = IndexedGeometry::new();
        g.add_vertex(Point3::new(0.0, 0.0, 0.0));
        g.add_vertex(Point3::new(1.0, 0.0, 0.0));
        g.add_vertex(Point3::new(0.0, 1.0, 0.0));
        g.add_face(0, 1, 2);
        g
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = IndexedGeometry::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.face_count(), 0);
    }

    #[test]
    fn test_merge_offsets_and_transforms() {
        let mut a = triangle();
        let b = triangle();
        let shift = Translation3::new(0.0, 0.0, 5.0).to_homogeneous();
        a.merge(&b, &shift);
        assert_eq!(a.vertex_count(), 6);
        assert_eq!(a.face_count(), 2);
        assert_eq!(a.faces[1].a, 3);
        assert_eq!(a.vertices[3], Point3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_uniform_color() {
        let mut g = triangle();
        g.set_color([1.0, 0.0, 0.0]);
        assert_eq!(g.uniform_color(), Some([1.0, 0.0, 0.0]));
        let mut other = triangle();
        other.set_color([0.0, 1.0, 0.0]);
        g.merge(&other, &Matrix4::identity());
        assert_eq!(g.uniform_color(), None);
    }

    #[test]
    fn test_to_buffer() {
        let mut g = triangle();
        g.set_color([0.2, 0.4, 0.6]);
        let buffer = g.to_buffer();
        assert_eq!(buffer.vertex_count(), 3);
        assert_eq!(buffer.triangle_count(), 1);
        assert_eq!(&buffer.normals[0..3], &[0.0, 0.0, 1.0]);
        assert_eq!(&buffer.colors[3..6], &[0.2, 0.4, 0.6]);
        assert!(buffer.uvs.is_empty());
    }

    #[test]
    fn test_bounds() {
        let g = triangle();
        let (min, max) = g.bounds();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_line_length() {
        let line = LineGeometry::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 4.0, 0.0),
            Point3::new(3.0, 4.0, 1.0),
        ]);
        assert!((line.length() - 6.0).abs() < 1e-12);
    }
}
