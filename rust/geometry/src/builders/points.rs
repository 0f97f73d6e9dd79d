// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point primitives, merged into a single point cloud

use crate::material::{Material, MaterialProperties};
use crate::mesh::{Geometry, PointGeometry, SceneObject};
use crate::transform::entity_color;
use crate::{parse, Result};
use flux_lite_core::entity::material_properties;
use serde_json::Value;
use std::sync::Arc;

/// Accumulates every point of a conversion into one cloud.
///
/// Size and attenuation come from the material of the first point pushed;
/// later points only contribute a position and a color.
#[derive(Debug, Default)]
pub struct PointCloudBuilder {
    geometry: PointGeometry,
    first_properties: Option<MaterialProperties>,
}

impl PointCloudBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one `point` entity; nothing is added when it is malformed
    pub fn push(&mut self, entity: &Value) -> Result<()> {
        let position = parse::point(entity, "point")?;
        self.geometry.push(&position, &entity_color(entity));
        if self.first_properties.is_none() {
            self.first_properties = Some(material_properties(entity));
        }
        Ok(())
    }

    /// Material properties of the first accepted point
    pub fn material_properties(&self) -> Option<&MaterialProperties> {
        self.first_properties.as_ref()
    }

    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// The cloud, or `None` when no point was accepted
    pub fn finish(self, material: Arc<Material>) -> Option<SceneObject> {
        if self.geometry.is_empty() {
            return None;
        }
        Some(SceneObject::new("point", Geometry::Points(self.geometry), material))
    }
}
