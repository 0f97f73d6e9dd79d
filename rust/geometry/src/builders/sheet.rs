// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sheet primitives: planar polygon sets and NURBS surfaces

use super::BuildContext;
use crate::material::Material;
use crate::mesh::{Geometry, IndexedGeometry, SceneObject};
use crate::nurbs::NurbsSurface;
use crate::transform::{finish_object, Frame};
use crate::triangulation::triangulate_planar;
use crate::{parse, GeometryError, Point3, Result};
use serde_json::Value;
use std::sync::Arc;

/// Triangulate every `{boundary, holes}` polygon into one mesh
pub fn polygon_set(entity: &Value, ctx: &mut BuildContext, material: Arc<Material>) -> Result<SceneObject> {
    let polygons = entity
        .get("polygons")
        .ok_or_else(|| GeometryError::MissingProperty("polygons".into()))?
        .as_array()
        .ok_or_else(|| GeometryError::invalid("polygons", "expected an array"))?;
    if polygons.is_empty() {
        return Err(GeometryError::Degenerate("polygon set is empty".into()));
    }

    let mut mesh = IndexedGeometry::new();
    for polygon in polygons {
        let boundary = parse::points(polygon, "boundary")?;
        let holes: Vec<Vec<Point3<f64>>> = match polygon.get("holes").filter(|h| !h.is_null()) {
            None => Vec::new(),
            Some(holes) => holes
                .as_array()
                .ok_or_else(|| GeometryError::invalid("holes", "expected an array of point lists"))?
                .iter()
                .map(|hole| parse::point_list(hole, "holes"))
                .collect::<Result<_>>()?,
        };

        let (_, vertices, indices) = triangulate_planar(&boundary, &holes, &mut ctx.pool)?;
        let offset = mesh.vertex_count() as u32;
        for v in vertices {
            mesh.add_vertex(v);
        }
        for tri in indices.chunks_exact(3) {
            mesh.add_face(
                offset + tri[0] as u32,
                offset + tri[1] as u32,
                offset + tri[2] as u32,
            );
        }
    }

    finish_object(entity, "polygonSet", Geometry::Indexed(mesh), material, Frame::ZUp)
}

fn control_grid(entity: &Value) -> Result<Vec<Vec<Point3<f64>>>> {
    entity
        .get("controlPoints")
        .ok_or_else(|| GeometryError::MissingProperty("controlPoints".into()))?
        .as_array()
        .ok_or_else(|| GeometryError::invalid("controlPoints", "expected a grid of points"))?
        .iter()
        .map(|row| parse::point_list(row, "controlPoints"))
        .collect()
}

fn weight_grid(entity: &Value) -> Result<Option<Vec<Vec<f64>>>> {
    match entity.get("weights").filter(|w| !w.is_null()) {
        None => Ok(None),
        Some(weights) => weights
            .as_array()
            .ok_or_else(|| GeometryError::invalid("weights", "expected a grid of numbers"))?
            .iter()
            .map(|row| parse::number_list(row, "weights"))
            .collect::<Result<Vec<_>>>()
            .map(Some),
    }
}

pub fn surface(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let surface = NurbsSurface::new(
        parse::count(entity, "uDegree")?,
        parse::count(entity, "vDegree")?,
        control_grid(entity)?,
        parse::numbers(entity, "uKnots")?,
        parse::numbers(entity, "vKnots")?,
        weight_grid(entity)?,
    )?;
    let (slices, stacks) = surface.resolution();
    tracing::trace!(slices, stacks, "tessellating surface");

    finish_object(
        entity,
        "surface",
        Geometry::Indexed(surface.tessellate()),
        material,
        Frame::ZUp,
    )
}
