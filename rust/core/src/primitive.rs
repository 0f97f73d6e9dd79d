// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flux primitive types
//!
//! Fast type checking using an enum instead of string comparison. Every
//! primitive the converter understands is a variant of [`PrimitiveKind`];
//! anything else is an unknown primitive.

use serde::Serialize;
use std::fmt;

/// Shading model a primitive renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Point,
    Line,
    Phong,
}

impl MaterialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialKind::Point => "point",
            MaterialKind::Line => "line",
            MaterialKind::Phong => "phong",
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder group a primitive belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveGroup {
    /// Containers and deferred entities that must be flattened away before building
    Special,
    /// Wire-frame curves drawn with a line material
    Wire,
    /// Open sheets drawn with a phong material
    Sheet,
    /// Closed solids and imported meshes drawn with a phong material
    Solid,
}

/// Flux primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    // Special
    Point,
    Polycurve,
    Polysurface,
    Brep,

    // Wire
    Line,
    Polyline,
    Circle,
    Ellipse,
    Rectangle,
    Arc,
    Curve,
    Vector,

    // Sheet
    PolygonSet,
    Surface,

    // Solid
    Cone,
    Cylinder,
    Sphere,
    Torus,
    Block,
    Mesh,
    Text,
    Obj,
    Stl,
}

/// Legacy primitive spellings still found in older Flux documents
const LEGACY_NAMES: &[(&str, &str)] = &[
    ("polygon-set", "polygonSet"),
    ("poly-curve", "polycurve"),
    ("poly-surface", "polysurface"),
];

/// Primitive names that bypass schema validation (imported formats, raw text, legacy spellings)
pub const NON_STANDARD_PRIMITIVES: &[&str] = &["obj", "stl", "text", "polygon-set"];

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 23] = [
        PrimitiveKind::Point,
        PrimitiveKind::Polycurve,
        PrimitiveKind::Polysurface,
        PrimitiveKind::Brep,
        PrimitiveKind::Line,
        PrimitiveKind::Polyline,
        PrimitiveKind::Circle,
        PrimitiveKind::Ellipse,
        PrimitiveKind::Rectangle,
        PrimitiveKind::Arc,
        PrimitiveKind::Curve,
        PrimitiveKind::Vector,
        PrimitiveKind::PolygonSet,
        PrimitiveKind::Surface,
        PrimitiveKind::Cone,
        PrimitiveKind::Cylinder,
        PrimitiveKind::Sphere,
        PrimitiveKind::Torus,
        PrimitiveKind::Block,
        PrimitiveKind::Mesh,
        PrimitiveKind::Text,
        PrimitiveKind::Obj,
        PrimitiveKind::Stl,
    ];

    /// Canonical Flux name
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Point => "point",
            PrimitiveKind::Polycurve => "polycurve",
            PrimitiveKind::Polysurface => "polysurface",
            PrimitiveKind::Brep => "brep",
            PrimitiveKind::Line => "line",
            PrimitiveKind::Polyline => "polyline",
            PrimitiveKind::Circle => "circle",
            PrimitiveKind::Ellipse => "ellipse",
            PrimitiveKind::Rectangle => "rectangle",
            PrimitiveKind::Arc => "arc",
            PrimitiveKind::Curve => "curve",
            PrimitiveKind::Vector => "vector",
            PrimitiveKind::PolygonSet => "polygonSet",
            PrimitiveKind::Surface => "surface",
            PrimitiveKind::Cone => "cone",
            PrimitiveKind::Cylinder => "cylinder",
            PrimitiveKind::Sphere => "sphere",
            PrimitiveKind::Torus => "torus",
            PrimitiveKind::Block => "block",
            PrimitiveKind::Mesh => "mesh",
            PrimitiveKind::Text => "text",
            PrimitiveKind::Obj => "obj",
            PrimitiveKind::Stl => "stl",
        }
    }

    /// Resolve a primitive name, mapping legacy spellings first
    pub fn from_name(name: &str) -> Option<Self> {
        let name = LEGACY_NAMES
            .iter()
            .find(|(legacy, _)| *legacy == name)
            .map(|(_, current)| *current)
            .unwrap_or(name);
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn group(&self) -> PrimitiveGroup {
        match self {
            PrimitiveKind::Point
            | PrimitiveKind::Polycurve
            | PrimitiveKind::Polysurface
            | PrimitiveKind::Brep => PrimitiveGroup::Special,
            PrimitiveKind::Line
            | PrimitiveKind::Polyline
            | PrimitiveKind::Circle
            | PrimitiveKind::Ellipse
            | PrimitiveKind::Rectangle
            | PrimitiveKind::Arc
            | PrimitiveKind::Curve
            | PrimitiveKind::Vector => PrimitiveGroup::Wire,
            PrimitiveKind::PolygonSet | PrimitiveKind::Surface => PrimitiveGroup::Sheet,
            PrimitiveKind::Cone
            | PrimitiveKind::Cylinder
            | PrimitiveKind::Sphere
            | PrimitiveKind::Torus
            | PrimitiveKind::Block
            | PrimitiveKind::Mesh
            | PrimitiveKind::Text
            | PrimitiveKind::Obj
            | PrimitiveKind::Stl => PrimitiveGroup::Solid,
        }
    }

    /// Material kind the primitive is drawn with.
    ///
    /// Breps carry phong geometry once resolved; points get a point material.
    /// Polycurves and polysurfaces never reach a builder.
    pub fn material_kind(&self) -> MaterialKind {
        match self {
            PrimitiveKind::Point => MaterialKind::Point,
            PrimitiveKind::Polycurve => MaterialKind::Line,
            PrimitiveKind::Polysurface | PrimitiveKind::Brep => MaterialKind::Phong,
            _ => match self.group() {
                PrimitiveGroup::Wire => MaterialKind::Line,
                _ => MaterialKind::Phong,
            },
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a primitive name skips schema lookup
#[inline]
pub fn is_non_standard(name: &str) -> bool {
    NON_STANDARD_PRIMITIVES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_legacy_names() {
        assert_eq!(PrimitiveKind::from_name("polygon-set"), Some(PrimitiveKind::PolygonSet));
        assert_eq!(PrimitiveKind::from_name("poly-curve"), Some(PrimitiveKind::Polycurve));
        assert_eq!(PrimitiveKind::from_name("teapot"), None);
    }

    #[test]
    fn test_material_kinds() {
        assert_eq!(PrimitiveKind::Point.material_kind(), MaterialKind::Point);
        assert_eq!(PrimitiveKind::Arc.material_kind(), MaterialKind::Line);
        assert_eq!(PrimitiveKind::Vector.material_kind(), MaterialKind::Line);
        assert_eq!(PrimitiveKind::PolygonSet.material_kind(), MaterialKind::Phong);
        assert_eq!(PrimitiveKind::Block.material_kind(), MaterialKind::Phong);
    }

    #[test]
    fn test_non_standard() {
        assert!(is_non_standard("stl"));
        assert!(is_non_standard("polygon-set"));
        assert!(!is_non_standard("polygonSet"));
    }
}
