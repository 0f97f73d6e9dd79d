// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Primitive builders
//!
//! One builder per [`PrimitiveKind`], dispatched through an exhaustive
//! match. Builders read a normalized entity and return a placed
//! [`SceneObject`] or a [`GeometryError`](crate::GeometryError) for the
//! caller to record.

pub mod import;
pub mod points;
pub mod sheet;
pub mod solid;
pub mod wire;

pub use points::PointCloudBuilder;

use crate::material::Material;
use crate::mesh::SceneObject;
use crate::pool::VectorPool;
use crate::{GeometryError, Result};
use flux_lite_core::entity::brep_has_inline_geometry;
use flux_lite_core::PrimitiveKind;
use serde_json::Value;
use std::sync::Arc;

/// Scratch state shared by the builders of one conversion
#[derive(Debug, Default)]
pub struct BuildContext {
    pub pool: VectorPool,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Build one primitive.
///
/// The scratch pool is reset before every call, so nothing drawn from it
/// survives into the next primitive.
pub fn build(
    kind: PrimitiveKind,
    entity: &Value,
    ctx: &mut BuildContext,
    material: Arc<Material>,
) -> Result<SceneObject> {
    ctx.pool.clear();

    match kind {
        PrimitiveKind::Line => wire::line(entity, material),
        PrimitiveKind::Polyline => wire::polyline(entity, material),
        PrimitiveKind::Circle => wire::circle(entity, material),
        PrimitiveKind::Ellipse => wire::ellipse(entity, material),
        PrimitiveKind::Rectangle => wire::rectangle(entity, material),
        PrimitiveKind::Arc => wire::arc(entity, ctx, material),
        PrimitiveKind::Curve => wire::curve(entity, material),
        PrimitiveKind::Vector => wire::vector(entity, material),
        PrimitiveKind::PolygonSet => sheet::polygon_set(entity, ctx, material),
        PrimitiveKind::Surface => sheet::surface(entity, material),
        PrimitiveKind::Cone => solid::cone(entity, material),
        PrimitiveKind::Cylinder => solid::cylinder(entity, material),
        PrimitiveKind::Sphere => solid::sphere(entity, material),
        PrimitiveKind::Torus => solid::torus(entity, material),
        PrimitiveKind::Block => solid::block(entity, material),
        PrimitiveKind::Mesh => solid::mesh(entity, material),
        PrimitiveKind::Brep if brep_has_inline_geometry(entity) => solid::brep(entity, material),
        PrimitiveKind::Text => import::text(entity, material),
        PrimitiveKind::Obj => import::obj(entity, material),
        PrimitiveKind::Stl => import::stl(entity, material),
        PrimitiveKind::Point
        | PrimitiveKind::Polycurve
        | PrimitiveKind::Polysurface
        | PrimitiveKind::Brep => Err(GeometryError::NotBuildable(kind.name())),
    }
}
