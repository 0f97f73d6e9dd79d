// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion pipeline: flatten, validate, build, merge, upgrade.

use crate::config::PipelineConfig;
use crate::flatten::{flatten, Entry, Flattened};
use crate::merge::{merge, upgrade};
use crate::results::{GeometryResults, ProcessingStats};
use crate::{Error, Result};
use flux_lite_core::entity::material_properties;
use flux_lite_core::{MaterialKind, SchemaValidator, StatusMap, UnitRegistry, UnitWarning};
use flux_lite_geometry::{build, BuildContext, MaterialCache, PointCloudBuilder, Scene, SceneObject, TextureRef};
use serde_json::Value;
use std::time::Instant;

/// Objects produced by the build stage, before merging
struct Built {
    point_cloud: Option<SceneObject>,
    objects: Vec<SceneObject>,
    unit_warnings: Vec<UnitWarning>,
}

/// Converts Flux entity trees into renderable scenes.
///
/// Materials are cached across conversions, so equal materials from
/// separate calls are the same `Arc`.
#[derive(Debug)]
pub struct FluxConverter {
    config: PipelineConfig,
    validator: SchemaValidator,
    units: &'static UnitRegistry,
    materials: MaterialCache,
    ctx: BuildContext,
}

impl FluxConverter {
    /// Converter configured from `FLUX_*` environment variables.
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::from_env())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            validator: SchemaValidator::new(),
            units: UnitRegistry::standard(),
            materials: MaterialCache::new(),
            ctx: BuildContext::new(),
        }
    }

    /// Environment maps used by the roughness approximation of phong materials.
    ///
    /// Replaces the material cache, since cached materials were resolved
    /// without these textures.
    pub fn with_environment_textures(mut self, textures: Vec<TextureRef>) -> Self {
        self.materials = MaterialCache::with_environment(textures);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Convert an entity or an array of entities.
    ///
    /// Bad primitives are recorded on the returned status map and skipped;
    /// only a root that is neither an object nor an array is an error.
    pub fn create_object(&mut self, data: &Value) -> Result<GeometryResults> {
        if !data.is_object() && !data.is_array() {
            return Err(Error::InvalidInput(format!(
                "expected an entity object or array, got {}",
                json_type(data)
            )));
        }

        let total_start = Instant::now();
        let mut status = StatusMap::new();
        let flat = flatten(data, &mut status);
        let entities = flat.len();
        tracing::info!(entities = entities, async_prims = flat.async_prims.len(), "Starting Flux conversion");

        let build_start = Instant::now();
        let async_prims: Vec<Value> = flat.async_prims.iter().map(|v| (*v).clone()).collect();
        let built = self.build_all(&flat, &mut status);
        let build_time = build_start.elapsed();
        let built_count = built.objects.len() + usize::from(built.point_cloud.is_some());
        tracing::debug!(objects = built_count, build_time_ms = build_time.as_millis(), "Build phase complete");

        let (mut objects, merged) = if self.config.merge_meshes {
            merge(built.objects)
        } else {
            (built.objects, 0)
        };
        if self.config.buffer_geometry {
            objects = upgrade(objects);
        }

        let mut mesh = Scene::new();
        if let Some(cloud) = built.point_cloud {
            mesh.add(cloud);
        }
        for object in objects {
            mesh.add(object);
        }

        let stats = ProcessingStats {
            entities,
            built: built_count,
            merged,
            errors: status.invalid_keys().count(),
            async_prims: async_prims.len(),
            build_time_ms: build_time.as_millis() as u64,
            total_time_ms: total_start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            objects = mesh.len(),
            merged = stats.merged,
            errors = stats.errors,
            unit_warnings = built.unit_warnings.len(),
            total_time_ms = stats.total_time_ms,
            "Flux conversion complete"
        );
        if !status.is_valid() {
            tracing::debug!(summary = %status.invalid_key_summary(), "Primitives with errors");
        }

        Ok(GeometryResults {
            mesh,
            prim_status: status,
            async_prims,
            unit_warnings: built.unit_warnings,
            stats,
        })
    }

    fn build_all(&mut self, flat: &Flattened<'_>, status: &mut StatusMap) -> Built {
        let mut unit_warnings = Vec::new();
        let point_cloud = self.build_points(&flat.points, status, &mut unit_warnings);

        let mut objects = Vec::with_capacity(flat.lines.len() + flat.meshes.len());
        for entry in flat.lines.iter().chain(&flat.meshes) {
            let Some(entity) = self.prepare(entry, status, &mut unit_warnings) else {
                continue;
            };
            let material = self
                .materials
                .resolve(entry.kind.material_kind(), &material_properties(&entity));
            match build(entry.kind, &entity, &mut self.ctx, material) {
                Ok(object) => {
                    status.append_valid(entry.name);
                    objects.push(object);
                }
                Err(e) => {
                    tracing::debug!(primitive = entry.name, error = %e, "Primitive failed to build");
                    status.append_error(entry.name, &e.to_string());
                }
            }
        }

        Built {
            point_cloud,
            objects,
            unit_warnings,
        }
    }

    /// Merge every point entity into one cloud
    fn build_points(
        &mut self,
        points: &[Entry<'_>],
        status: &mut StatusMap,
        unit_warnings: &mut Vec<UnitWarning>,
    ) -> Option<SceneObject> {
        let mut cloud = PointCloudBuilder::new();
        for entry in points {
            let Some(entity) = self.prepare(entry, status, unit_warnings) else {
                continue;
            };
            match cloud.push(&entity) {
                Ok(()) => status.append_valid(entry.name),
                Err(e) => status.append_error(entry.name, &e.to_string()),
            }
        }
        if cloud.is_empty() {
            return None;
        }
        let properties = cloud.material_properties().cloned().unwrap_or_default();
        let material = self.materials.resolve(MaterialKind::Point, &properties);
        cloud.finish(material)
    }

    /// Schema gate and unit normalization; `None` drops the entity
    fn prepare(&self, entry: &Entry<'_>, status: &mut StatusMap, unit_warnings: &mut Vec<UnitWarning>) -> Option<Value> {
        if self.config.validate_schema && !self.validator.check_schema(entry.entity, status) {
            return None;
        }
        let normalized = self.units.convert_units(entry.entity);
        unit_warnings.extend(normalized.warnings);
        Some(normalized.entity)
    }
}

impl Default for FluxConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_root_is_rejected() {
        let mut converter = FluxConverter::new();
        for data in [json!(null), json!(3), json!("sphere")] {
            assert!(matches!(converter.create_object(&data), Err(Error::InvalidInput(_))));
        }
    }

    #[test]
    fn test_disabled_stages_keep_indexed_meshes() {
        let config = PipelineConfig {
            validate_schema: false,
            merge_meshes: false,
            buffer_geometry: false,
        };
        let mut converter = FluxConverter::with_config(config);
        let block = json!({"primitive": "block", "origin": [0, 0, 0], "dimensions": [1, 1, 1]});
        let results = converter.create_object(&json!([block.clone(), block])).unwrap();
        let scene = results.get_mesh().unwrap();
        assert_eq!(scene.len(), 2);
        assert!(scene.children.iter().all(|c| c.geometry.is_indexed()));
        assert_eq!(*converter.config(), config);
    }

    #[test]
    fn test_new_reads_environment() {
        assert_eq!(*FluxConverter::new().config(), PipelineConfig::from_env());
    }

    #[test]
    fn test_points_share_one_cloud() {
        let mut converter = FluxConverter::new();
        let data = json!([
            {"primitive": "point", "point": [0, 0, 0], "materialProperties": {"size": 3}},
            {"primitive": "point", "point": [1, 1, 1]},
            {"primitive": "line", "start": [0, 0, 0], "end": [1, 0, 0]}
        ]);
        let results = converter.create_object(&data).unwrap();
        let scene = results.get_mesh().unwrap();
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.children[0].name, "point");
        assert_eq!(scene.children[0].geometry.vertex_count(), 2);
        assert_eq!(scene.children[0].material.size, 3.0);
        assert!(results.prim_status.valid_key("point"));
    }
}
