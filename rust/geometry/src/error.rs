// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, GeometryError>;

/// User-caused geometry problems: malformed, degenerate or under-constrained
/// primitive data. Recorded per primitive, never fatal to a batch.
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Missing required property '{0}'")]
    MissingProperty(String),

    #[error("Invalid property '{property}': {reason}")]
    InvalidProperty { property: String, reason: String },

    #[error("Invalid knot vector: {0}")]
    InvalidKnots(String),

    #[error("Polygon is not planar: point {index} is {distance:.3e} from the plane")]
    NonPlanar { index: usize, distance: f64 },

    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    #[error("Triangulation failed: {0}")]
    Triangulation(String),

    #[error("Invalid {format} data: {reason}")]
    ImportFormat { format: &'static str, reason: String },

    #[error("Primitive '{0}' must be flattened before building")]
    NotBuildable(&'static str),

    #[error("Core error: {0}")]
    Core(#[from] flux_lite_core::Error),
}

impl GeometryError {
    pub fn invalid(property: &str, reason: impl Into<String>) -> Self {
        GeometryError::InvalidProperty {
            property: property.to_string(),
            reason: reason.into(),
        }
    }
}
