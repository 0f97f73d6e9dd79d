// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the entity model, unit registry and schema layer
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema compilation failed for '{primitive}': {message}")]
    SchemaCompile { primitive: String, message: String },

    #[error("Invalid unit conversion operand: {0}")]
    InvalidOperand(String),

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
