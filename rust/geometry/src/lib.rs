// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flux-Lite Geometry
//!
//! Builds renderable meshes, poly-lines and point clouds from normalized
//! Flux primitives, using earcutr triangulation and nalgebra for
//! transformations.

pub mod builders;
pub mod error;
pub mod material;
pub mod mesh;
pub mod nurbs;
pub mod parse;
pub mod pool;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector2, Vector3};

pub use builders::{build, BuildContext, PointCloudBuilder};
pub use error::{GeometryError, Result};
pub use material::{
    create_material, parse_color, resolve_type, Material, MaterialCache, MaterialProperties, Side, TextureRef,
};
pub use mesh::{
    BufferGeometry, Color, Face, Geometry, IndexedGeometry, LabelGeometry, LineGeometry, PointGeometry, Scene,
    SceneObject, SceneStats, DEFAULT_COLOR,
};
pub use nurbs::{NurbsCurve, NurbsSurface};
pub use pool::{PoolKey, VectorPool};
pub use triangulation::{triangulate_planar, PlaneBasis};

/// Distance and angle tolerance for degeneracy and planarity checks
pub const TOLERANCE: f64 = 1e-6;
