// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Terminal value of a conversion.

use flux_lite_core::{StatusMap, UnitWarning};
use flux_lite_geometry::{Scene, SceneStats};
use serde::Serialize;
use serde_json::Value;

/// Counters and timings for one conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    /// Leaf primitives found while flattening.
    pub entities: usize,
    /// Objects built before merging.
    pub built: usize,
    /// Merges performed.
    pub merged: usize,
    /// Primitive types with at least one recorded error.
    pub errors: usize,
    /// Breps handed to the external resolver.
    pub async_prims: usize,
    /// Time spent validating and building (ms).
    pub build_time_ms: u64,
    /// Total conversion time (ms).
    pub total_time_ms: u64,
}

/// Everything a conversion produced
#[derive(Debug, Clone, Default)]
pub struct GeometryResults {
    pub mesh: Scene,
    /// Errors per primitive type; valid types map to no errors
    pub prim_status: StatusMap,
    /// Breps without inline geometry, cloned from the input
    pub async_prims: Vec<Value>,
    pub unit_warnings: Vec<UnitWarning>,
    pub stats: ProcessingStats,
}

impl GeometryResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// The converted scene, `None` when nothing was built
    pub fn get_mesh(&self) -> Option<&Scene> {
        (!self.mesh.is_empty()).then_some(&self.mesh)
    }

    /// Consume the results, keeping only the scene
    pub fn into_mesh(self) -> Option<Scene> {
        (!self.mesh.is_empty()).then_some(self.mesh)
    }

    pub fn scene_stats(&self) -> SceneStats {
        self.mesh.stats()
    }

    /// Whether every primitive seen converted without error
    pub fn is_valid(&self) -> bool {
        self.prim_status.is_valid()
    }

    pub fn clear(&mut self) {
        self.mesh = Scene::new();
        self.prim_status.clear();
        self.async_prims.clear();
        self.unit_warnings.clear();
        self.stats = ProcessingStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_results_have_no_mesh() {
        let mut results = GeometryResults::new();
        assert!(results.get_mesh().is_none());

        results.prim_status.append_error("sphere", "bad radius");
        results.async_prims.push(json!({"primitive": "brep"}));
        results.clear();
        assert!(results.prim_status.is_empty());
        assert!(results.async_prims.is_empty());
        assert!(results.into_mesh().is_none());
    }

    #[test]
    fn test_stats_serialize() {
        let stats = ProcessingStats {
            entities: 3,
            built: 2,
            ..ProcessingStats::default()
        };
        let value = serde_json::to_value(stats).unwrap_or_default();
        assert_eq!(value["entities"], json!(3));
        assert_eq!(value["built"], json!(2));
    }
}
