// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Non-standard primitives: text labels and embedded ASCII OBJ / STL meshes
//!
//! Only the geometric subset of each format is read: OBJ `v` and `f`
//! records, STL `vertex` records. Everything else is ignored.

use crate::material::Material;
use crate::mesh::{Geometry, IndexedGeometry, LabelGeometry, SceneObject};
use crate::transform::{entity_color, finish_object, Frame};
use crate::{parse, GeometryError, Point3, Result};
use rustc_hash::FxHashMap;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

pub const DEFAULT_TEXT_SIZE: f64 = 1.0;

pub fn text(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let label = LabelGeometry {
        text: parse::string(entity, "text")?.to_string(),
        size: parse::number_or(entity, "size", DEFAULT_TEXT_SIZE)?,
        color: entity_color(entity),
    };
    finish_object(entity, "text", Geometry::Label(label), material, Frame::ZUp)
}

#[inline]
fn format_error(format: &'static str, line: usize, reason: impl std::fmt::Display) -> GeometryError {
    GeometryError::ImportFormat {
        format,
        reason: format!("line {}: {}", line + 1, reason),
    }
}

fn parse_coords<'a>(
    mut fields: impl Iterator<Item = &'a str>,
    format: &'static str,
    line: usize,
) -> Result<Point3<f64>> {
    let mut coords = [0.0; 3];
    for slot in &mut coords {
        let field = fields
            .next()
            .ok_or_else(|| format_error(format, line, "expected 3 coordinates"))?;
        *slot = field
            .parse()
            .map_err(|_| format_error(format, line, format!("invalid coordinate '{}'", field)))?;
    }
    Ok(Point3::new(coords[0], coords[1], coords[2]))
}

/// Parse the `v` and `f` records of a Wavefront OBJ document
pub fn parse_obj(data: &str) -> Result<IndexedGeometry> {
    let mut mesh = IndexedGeometry::new();

    for (line_no, line) in data.lines().enumerate() {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("v") => {
                mesh.add_vertex(parse_coords(fields, "obj", line_no)?);
            }
            Some("f") => {
                let count = mesh.vertex_count() as i64;
                let indices = fields
                    .map(|field| {
                        // v, v/vt, v//vn or v/vt/vn; negative indices count from the end
                        let raw: i64 = field
                            .split('/')
                            .next()
                            .and_then(|v| v.parse().ok())
                            .ok_or_else(|| format_error("obj", line_no, format!("invalid face index '{}'", field)))?;
                        let index = if raw < 0 { count + raw } else { raw - 1 };
                        if index < 0 || index >= count {
                            return Err(format_error("obj", line_no, format!("face index {} out of range", raw)));
                        }
                        Ok(index as u32)
                    })
                    .collect::<Result<SmallVec<[u32; 4]>>>()?;
                if indices.len() < 3 {
                    return Err(format_error("obj", line_no, "a face needs at least 3 vertices"));
                }
                for k in 1..indices.len() - 1 {
                    mesh.add_face(indices[0], indices[k], indices[k + 1]);
                }
            }
            _ => {}
        }
    }

    if mesh.is_empty() {
        return Err(GeometryError::ImportFormat {
            format: "obj",
            reason: "no faces found".into(),
        });
    }
    Ok(mesh)
}

/// Parse the facets of an ASCII STL document, welding identical vertices
pub fn parse_stl(data: &str) -> Result<IndexedGeometry> {
    let mut mesh = IndexedGeometry::new();
    let mut welded: FxHashMap<[u64; 3], u32> = FxHashMap::default();
    let mut facet: SmallVec<[Point3<f64>; 3]> = SmallVec::new();

    for (line_no, line) in data.lines().enumerate() {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("vertex") => facet.push(parse_coords(fields, "stl", line_no)?),
            Some("endfacet") => {
                if facet.len() != 3 {
                    return Err(format_error("stl", line_no, format!("facet has {} vertices", facet.len())));
                }
                let mut corners = [0u32; 3];
                for (corner, p) in corners.iter_mut().zip(facet.drain(..)) {
                    let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
                    *corner = *welded.entry(key).or_insert_with(|| mesh.add_vertex(p));
                }
                mesh.add_face(corners[0], corners[1], corners[2]);
            }
            _ => {}
        }
    }

    if !facet.is_empty() {
        tracing::warn!(vertices = facet.len(), "dropping STL facet without endfacet");
    }

    if mesh.is_empty() {
        return Err(GeometryError::ImportFormat {
            format: "stl",
            reason: "no facets found".into(),
        });
    }
    Ok(mesh)
}

pub fn obj(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let mesh = parse_obj(parse::string(entity, "data")?)?;
    finish_object(entity, "obj", Geometry::Indexed(mesh), material, Frame::ZUp)
}

pub fn stl(entity: &Value, material: Arc<Material>) -> Result<SceneObject> {
    let mesh = parse_stl(parse::string(entity, "data")?)?;
    finish_object(entity, "stl", Geometry::Indexed(mesh), material, Frame::ZUp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::create_material;
    use flux_lite_core::MaterialKind;
    use serde_json::{json, Map};

    const CUBE_CORNER_OBJ: &str = "\
# corner
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
f -4 -3 -1
";

    const TRIANGLES_STL: &str = "\
solid pair
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 1 1 0
  endloop
endfacet
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 1 0
    vertex 0 1 0
  endloop
endfacet
endsolid pair
";

    #[test]
    fn test_parse_obj() {
        let mesh = parse_obj(CUBE_CORNER_OBJ).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 3);
        assert_eq!((mesh.faces[2].a, mesh.faces[2].b, mesh.faces[2].c), (0, 1, 3));
    }

    #[test]
    fn test_obj_errors() {
        assert!(parse_obj("v 0 0 0\nf 1 2 3\n").is_err());
        assert!(parse_obj("v 0 0\n").is_err());
        assert!(parse_obj("# nothing\n").is_err());
    }

    #[test]
    fn test_parse_stl_welds_vertices() {
        let mesh = parse_stl(TRIANGLES_STL).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
    }

    #[test]
    fn test_stl_incomplete_facet() {
        let data = "facet\nvertex 0 0 0\nvertex 1 0 0\nendfacet\n";
        assert!(matches!(parse_stl(data), Err(GeometryError::ImportFormat { format: "stl", .. })));
    }

    #[test]
    fn test_stl_unterminated_trailing_facet_is_dropped() {
        let data = format!("{}facet normal 0 0 1\nvertex 5 5 5\nvertex 6 5 5\nvertex 6 6 5\n", TRIANGLES_STL);
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);

        let lone = "facet\nvertex 0 0 0\nvertex 1 0 0\nvertex 1 1 0\n";
        assert!(matches!(parse_stl(lone), Err(GeometryError::ImportFormat { format: "stl", .. })));
    }

    #[test]
    fn test_text_label() {
        let material = Arc::new(create_material(MaterialKind::Phong, &Map::new(), None));
        let entity = json!({"primitive": "text", "text": "Level 1", "origin": [0, 0, 3]});
        let object = text(&entity, material).unwrap();
        match &object.geometry {
            Geometry::Label(label) => {
                assert_eq!(label.text, "Level 1");
                assert_eq!(label.size, DEFAULT_TEXT_SIZE);
            }
            other => panic!("expected label, got {:?}", other),
        }
    }
}
