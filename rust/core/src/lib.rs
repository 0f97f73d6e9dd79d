// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Flux-Lite Core
//!
//! Entity model, unit normalization and schema validation for Flux JSON.
//!
//! ## Overview
//!
//! - **Entities**: untyped `serde_json::Value` trees carrying a `primitive`
//!   discriminator ([`entity`])
//! - **Primitive kinds**: closed enum over every supported primitive and its
//!   material kind ([`PrimitiveKind`], [`MaterialKind`])
//! - **Units**: registry of units, aliases and conversion factors plus the
//!   per-entity normalization pass ([`UnitRegistry`])
//! - **Schema**: lazily compiled, memoized per-primitive validators
//!   ([`SchemaValidator`])
//! - **Status**: per-primitive error accumulation ([`StatusMap`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flux_lite_core::{SchemaValidator, StatusMap, UnitRegistry};
//! use serde_json::json;
//!
//! let entity = json!({
//!     "primitive": "sphere",
//!     "origin": [0, 0, 0],
//!     "radius": 250,
//!     "units": {"radius": "mm"}
//! });
//!
//! let mut status = StatusMap::new();
//! if SchemaValidator::new().check_schema(&entity, &mut status) {
//!     let normalized = UnitRegistry::standard().convert_units(&entity);
//!     assert_eq!(normalized.entity["radius"], json!(0.25));
//! }
//! ```

pub mod entity;
pub mod error;
pub mod primitive;
pub mod schema;
pub mod status;
pub mod units;

pub use error::{Error, Result};
pub use primitive::{is_non_standard, MaterialKind, PrimitiveGroup, PrimitiveKind};
pub use schema::{SchemaValidator, UNDEFINED_KEY, UNKNOWN_PRIMITIVE};
pub use status::StatusMap;
pub use units::{Normalized, UnitConversion, UnitRegistry, UnitWarning, UnitWarningKind};
