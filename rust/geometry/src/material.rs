// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material resolution and deduplication
//!
//! Materials are identified by a canonical key built from their kind and the
//! sorted list of known properties. Color is deliberately not part of a
//! material: builders move it onto the geometry, so differently colored
//! primitives can share one material and be merged.

use crate::mesh::Color;
use flux_lite_core::{MaterialKind, PrimitiveKind};
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Properties copied for point materials
const POINT_PROPERTIES: &[&str] = &["opacity", "size", "sizeAttenuation"];
/// Properties copied for line materials
const LINE_PROPERTIES: &[&str] = &["linewidth", "opacity"];
/// Properties copied for phong materials
const PHONG_PROPERTIES: &[&str] = &["opacity", "roughness", "shininess", "side", "wireframe"];

pub const DEFAULT_POINT_SIZE: f32 = 1.0;
pub const DEFAULT_LINE_WIDTH: f32 = 1.0;
pub const DEFAULT_SHININESS: f32 = 30.0;

/// Raw material properties as they appear on an entity
pub type MaterialProperties = Map<String, Value>;

/// Handle to an environment texture owned by the host renderer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TextureRef(pub String);

/// Which faces a phong material renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// A resolved material shared between scene objects
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    kind: MaterialKind,
    key: String,
    /// Known properties after whitelisting, sorted by name
    properties: Vec<(String, Value)>,
    pub opacity: f32,
    pub transparent: bool,
    /// Colors come from the geometry's color channel
    pub vertex_colors: bool,
    pub size: f32,
    pub size_attenuation: bool,
    pub linewidth: f32,
    pub wireframe: bool,
    pub side: Side,
    pub shininess: f32,
    pub specular: Option<Color>,
    pub env_map: Option<TextureRef>,
}

impl Material {
    #[inline]
    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    /// Canonical identity used for deduplication and merging
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn properties(&self) -> &[(String, Value)] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

/// Builder and material kind for a primitive name, legacy spellings included
pub fn resolve_type(name: &str) -> Option<(PrimitiveKind, MaterialKind)> {
    PrimitiveKind::from_name(name).map(|kind| (kind, kind.material_kind()))
}

fn known_properties(kind: MaterialKind) -> &'static [&'static str] {
    match kind {
        MaterialKind::Point => POINT_PROPERTIES,
        MaterialKind::Line => LINE_PROPERTIES,
        MaterialKind::Phong => PHONG_PROPERTIES,
    }
}

/// Numbers are compared as f64 so `1` and `1.0` produce the same key
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Number(n) => n.as_f64().map(Value::from).unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}

/// Canonical key: JSON kind followed by the JSON sorted property list
pub fn material_key(kind: MaterialKind, properties: &[(String, Value)]) -> String {
    let kind_json = serde_json::to_string(kind.as_str()).unwrap_or_default();
    let props_json = serde_json::to_string(properties).unwrap_or_default();
    format!("{}{}", kind_json, props_json)
}

/// Build a material from raw properties.
///
/// Only the properties known for `kind` are copied. Roughness is turned into
/// a specular level and an environment map only when both a roughness value
/// and environment textures are supplied.
pub fn create_material(
    kind: MaterialKind,
    raw: &MaterialProperties,
    environment: Option<&[TextureRef]>,
) -> Material {
    let mut properties: Vec<(String, Value)> = known_properties(kind)
        .iter()
        .filter_map(|name| {
            raw.get(*name)
                .filter(|v| !v.is_null())
                .map(|v| (name.to_string(), canonical_value(v)))
        })
        .collect();
    properties.sort_by(|a, b| a.0.cmp(&b.0));

    let number = |name: &str| {
        properties
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_f64())
    };
    let flag = |name: &str| {
        properties
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_bool())
    };

    let opacity = number("opacity").unwrap_or(1.0).clamp(0.0, 1.0) as f32;
    let side = properties
        .iter()
        .find(|(k, _)| k == "side")
        .and_then(|(_, v)| v.as_str())
        .map(|s| match s {
            "back" => Side::Back,
            "double" => Side::Double,
            _ => Side::Front,
        })
        .unwrap_or_default();

    let mut material = Material {
        kind,
        key: material_key(kind, &properties),
        opacity,
        transparent: opacity < 1.0,
        vertex_colors: true,
        size: number("size").unwrap_or(DEFAULT_POINT_SIZE as f64) as f32,
        size_attenuation: flag("sizeAttenuation").unwrap_or(true),
        linewidth: number("linewidth").unwrap_or(DEFAULT_LINE_WIDTH as f64) as f32,
        wireframe: flag("wireframe").unwrap_or(false),
        side,
        shininess: number("shininess").unwrap_or(DEFAULT_SHININESS as f64) as f32,
        specular: None,
        env_map: None,
        properties: Vec::new(),
    };

    if kind == MaterialKind::Phong {
        if let (Some(roughness), Some(textures)) = (number("roughness"), environment) {
            apply_roughness(&mut material, roughness, textures);
        }
    }

    material.properties = properties;
    material
}

/// Approximate roughness with an environment map and a specular level.
///
/// Rougher surfaces pick blurrier maps: the map index is
/// `floor(roughness^0.2 * count)`, clamped to the last texture.
fn apply_roughness(material: &mut Material, roughness: f64, textures: &[TextureRef]) {
    if textures.is_empty() {
        return;
    }
    let roughness = roughness.clamp(0.0, 1.0);
    let index = ((roughness.powf(0.2) * textures.len() as f64).floor() as usize).min(textures.len() - 1);
    material.env_map = Some(textures[index].clone());
    let level = (1.0 - roughness) as f32;
    material.specular = Some([level, level, level]);
}

/// Parse a color given as `[r, g, b]` in `[0, 1]` or a `#rrggbb` / `#rgb` string
pub fn parse_color(value: &Value) -> Option<Color> {
    match value {
        Value::Array(items) if items.len() == 3 => {
            let mut color = [0.0f32; 3];
            for (slot, item) in color.iter_mut().zip(items) {
                *slot = item.as_f64()?.clamp(0.0, 1.0) as f32;
            }
            Some(color)
        }
        Value::String(s) => {
            let hex = s.strip_prefix('#')?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            let bits = u32::from_str_radix(hex, 16).ok()?;
            let (r, g, b) = match hex.len() {
                6 => (bits >> 16, (bits >> 8) & 0xff, bits & 0xff),
                // #rgb doubles every digit
                3 => ((bits >> 8) * 0x11, ((bits >> 4) & 0xf) * 0x11, (bits & 0xf) * 0x11),
                _ => return None,
            };
            Some([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0])
        }
        _ => None,
    }
}

/// Deduplicates materials by key so equal materials share one allocation
#[derive(Debug, Default)]
pub struct MaterialCache {
    materials: FxHashMap<String, Arc<Material>>,
    environment: Option<Vec<TextureRef>>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(textures: Vec<TextureRef>) -> Self {
        Self {
            materials: FxHashMap::default(),
            environment: Some(textures),
        }
    }

    /// Shared material for `kind` and `raw` properties
    pub fn resolve(&mut self, kind: MaterialKind, raw: &MaterialProperties) -> Arc<Material> {
        let material = create_material(kind, raw, self.environment.as_deref());
        Arc::clone(
            self.materials
                .entry(material.key().to_string())
                .or_insert_with(|| Arc::new(material)),
        )
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn clear(&mut self) {
        self.materials.clear();
    }
}
