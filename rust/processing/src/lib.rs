// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Flux-Lite Processing
//!
//! Turns a Flux entity tree into a renderable [`Scene`](flux_lite_geometry::Scene).
//!
//! Each conversion runs five stages, each a function of the previous
//! stage's output:
//!
//! 1. [`flatten`] nested arrays and containers into per-material buckets
//! 2. validate against the schema and normalize units
//! 3. build every primitive, isolating failures per primitive type
//! 4. [`merge`] adjacent meshes that share a material and color
//! 5. [`upgrade`] the survivors to flat vertex buffers
//!
//! ```rust,ignore
//! use flux_lite_processing::FluxConverter;
//! use serde_json::json;
//!
//! let mut converter = FluxConverter::new();
//! let results = converter.create_object(&json!([
//!     {"primitive": "block", "origin": [0, 0, 0], "dimensions": [1, 2, 3]},
//!     {"primitive": "sphere", "origin": [0, 0, 0], "radius": -1}
//! ]))?;
//!
//! assert_eq!(results.get_mesh().map(|scene| scene.len()), Some(1));
//! println!("{}", results.prim_status.invalid_key_summary());
//! ```

pub mod config;
pub mod error;
pub mod flatten;
pub mod merge;
pub mod pipeline;
pub mod results;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use flatten::{flatten, Entry, Flattened};
pub use merge::{merge, upgrade, MERGED_NAME};
pub use pipeline::FluxConverter;
pub use results::{GeometryResults, ProcessingStats};
