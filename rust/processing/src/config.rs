// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration, optionally loaded from environment variables.

/// Switches for the optional pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Check every entity against the bundled schema before building it.
    pub validate_schema: bool,
    /// Merge adjacent meshes sharing a material and color.
    pub merge_meshes: bool,
    /// Convert indexed meshes to flat vertex buffers at the end.
    pub buffer_geometry: bool,
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            lookup(key)
                .unwrap_or_else(|| "true".into())
                .parse()
                .unwrap_or(true)
        };
        Self {
            validate_schema: flag("FLUX_VALIDATE_SCHEMA"),
            merge_meshes: flag("FLUX_MERGE_MESHES"),
            buffer_geometry: flag("FLUX_BUFFER_GEOMETRY"),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validate_schema: true,
            merge_meshes: true,
            buffer_geometry: true,
        }
    }
}
