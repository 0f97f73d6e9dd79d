// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit registry and entity unit normalization
//!
//! Flux entities carry a `units` map from slash-delimited property paths to
//! unit names. Normalization rewrites every listed property into the default
//! unit of its dimension (lengths become meters) on a deep copy of the
//! entity. Only length has working conversions; the other dimensions are
//! known but pass values through unchanged.

use crate::entity::{child_ci_mut, UNITS_KEY};
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

pub const LENGTH: &str = "length";
pub const AREA: &str = "area";
pub const VOLUME: &str = "volume";
pub const TEMPERATURE: &str = "temperature";
pub const TIME: &str = "time";
pub const ANGLE: &str = "angle";
pub const MASS: &str = "mass";
pub const FORCE: &str = "force";
pub const ENERGY: &str = "energy";
pub const LUMINOUS_INTENSITY: &str = "luminous_intensity";

/// Table of units, their aliases, dimensions and conversion factors
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    /// Canonical name -> dimension
    dimensions: FxHashMap<String, String>,
    /// Lower-cased name or alias -> canonical name
    lookup: FxHashMap<String, String>,
    /// (from, to) canonical names -> scale
    conversions: FxHashMap<(String, String), f64>,
    /// Dimension -> default unit
    defaults: FxHashMap<String, String>,
}

/// A resolved scale between two units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConversion {
    factor: f64,
}

impl UnitConversion {
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Scale a number, or every number inside (nested) arrays.
    ///
    /// Objects and strings are returned untouched. A null or `false`
    /// operand is rejected.
    pub fn apply(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null | Value::Bool(false) => {
                Err(Error::InvalidOperand(value.to_string()))
            }
            _ => Ok(self.scale(value)),
        }
    }

    fn scale(&self, value: &Value) -> Value {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(v) if self.factor != 1.0 => Value::from(v * self.factor),
                _ => value.clone(),
            },
            Value::Array(items) => Value::Array(items.iter().map(|v| self.scale(v)).collect()),
            _ => value.clone(),
        }
    }
}

/// Why a unit entry was skipped during normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitWarningKind {
    /// The unit name is not registered
    UnknownUnit,
    /// The `units` value is not a string
    NotAString,
    /// A path segment does not exist on the entity
    MissingPath,
    /// The target value could not be converted
    InvalidValue,
}

/// A non-fatal unit normalization gap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitWarning {
    pub path: String,
    pub unit: String,
    pub kind: UnitWarningKind,
}

impl fmt::Display for UnitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            UnitWarningKind::UnknownUnit => "unknown unit",
            UnitWarningKind::NotAString => "unit is not a string",
            UnitWarningKind::MissingPath => "property not found",
            UnitWarningKind::InvalidValue => "value cannot be converted",
        };
        write!(f, "{} ({}): {}", self.path, self.unit, reason)
    }
}

/// Deep-copied entity with all resolvable units converted to defaults
#[derive(Debug, Clone)]
pub struct Normalized {
    pub entity: Value,
    pub warnings: Vec<UnitWarning>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit under a dimension.
    ///
    /// The first unit registered for a dimension becomes its default.
    pub fn add_unit(&mut self, name: &str, dimension: &str, aliases: &[&str]) {
        self.dimensions.insert(name.to_string(), dimension.to_string());
        self.lookup.insert(name.to_lowercase(), name.to_string());
        for alias in aliases {
            self.lookup.insert(alias.to_lowercase(), name.to_string());
        }
        self.defaults
            .entry(dimension.to_string())
            .or_insert_with(|| name.to_string());
    }

    /// Register `value_in_to = value_in_from * scale` and its inverse
    pub fn add_conversion(&mut self, from: &str, to: &str, scale: f64) {
        let (Some(from), Some(to)) = (self.canonical(from), self.canonical(to)) else {
            return;
        };
        let (from, to) = (from.to_string(), to.to_string());
        if scale != 0.0 {
            self.conversions.insert((to.clone(), from.clone()), 1.0 / scale);
        }
        self.conversions.insert((from, to), scale);
    }

    /// Canonical unit name for a name or alias
    pub fn canonical(&self, unit: &str) -> Option<&str> {
        self.lookup.get(&unit.to_lowercase()).map(String::as_str)
    }

    pub fn dimension_of(&self, unit: &str) -> Option<&str> {
        let name = self.canonical(unit)?;
        self.dimensions.get(name).map(String::as_str)
    }

    pub fn default_unit(&self, dimension: &str) -> Option<&str> {
        self.defaults.get(dimension).map(String::as_str)
    }

    /// Scale factor from one unit to another.
    ///
    /// Identical or alias-equal units give 1.0, registered conversions give
    /// their scale, known units without a conversion pass through at 1.0 and
    /// unknown units give `None`.
    pub fn unit_conversion_factor(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        let from = self.canonical(from)?;
        let to = self.canonical(to)?;
        if from == to {
            return Some(1.0);
        }
        Some(
            self.conversions
                .get(&(from.to_string(), to.to_string()))
                .copied()
                .unwrap_or(1.0),
        )
    }

    pub fn unit_conversion_func(&self, from: &str, to: &str) -> Option<UnitConversion> {
        self.unit_conversion_factor(from, to)
            .map(|factor| UnitConversion { factor })
    }

    /// Convert every path listed in the entity's `units` map to the default
    /// unit of its dimension.
    ///
    /// Works on a deep copy; paths are processed in sorted order. Anything
    /// that cannot be resolved is skipped and reported as a warning.
    pub fn convert_units(&self, entity: &Value) -> Normalized {
        let mut out = entity.clone();
        let mut warnings = Vec::new();

        let mut entries: Vec<(String, Value)> = match entity.get(UNITS_KEY) {
            Some(Value::Object(units)) => units
                .iter()
                .map(|(path, unit)| (path.clone(), unit.clone()))
                .collect(),
            _ => return Normalized { entity: out, warnings },
        };
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (path, unit) in entries {
            let Some(unit) = unit.as_str() else {
                warnings.push(UnitWarning {
                    path,
                    unit: unit.to_string(),
                    kind: UnitWarningKind::NotAString,
                });
                continue;
            };
            let target = match self.dimension_of(unit).and_then(|d| self.default_unit(d)) {
                Some(target) => target.to_string(),
                None => {
                    warnings.push(UnitWarning {
                        path,
                        unit: unit.to_string(),
                        kind: UnitWarningKind::UnknownUnit,
                    });
                    continue;
                }
            };
            let Some(conversion) = self.unit_conversion_func(unit, &target) else {
                warnings.push(UnitWarning {
                    path,
                    unit: unit.to_string(),
                    kind: UnitWarningKind::UnknownUnit,
                });
                continue;
            };

            match convert_path(&mut out, &path, &conversion) {
                Ok(()) => {
                    if let Some(units) = out.get_mut(UNITS_KEY).and_then(Value::as_object_mut) {
                        units.insert(path, Value::String(target));
                    }
                }
                Err(kind) => warnings.push(UnitWarning {
                    path,
                    unit: unit.to_string(),
                    kind,
                }),
            }
        }

        for warning in &warnings {
            tracing::warn!(path = %warning.path, unit = %warning.unit, "Skipped unit conversion: {}", warning);
        }

        Normalized { entity: out, warnings }
    }

    /// The standard registry, built once per process
    pub fn standard() -> &'static UnitRegistry {
        static STANDARD: OnceLock<UnitRegistry> = OnceLock::new();
        STANDARD.get_or_init(build_standard_registry)
    }
}

/// Walk `path` case-insensitively and scale its leaf in place
fn convert_path(
    root: &mut Value,
    path: &str,
    conversion: &UnitConversion,
) -> std::result::Result<(), UnitWarningKind> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(UnitWarningKind::MissingPath);
    };

    let mut container = root;
    for segment in parents {
        container = child_ci_mut(container, segment).ok_or(UnitWarningKind::MissingPath)?;
    }
    let target = child_ci_mut(container, leaf).ok_or(UnitWarningKind::MissingPath)?;
    let converted = conversion
        .apply(target)
        .map_err(|_| UnitWarningKind::InvalidValue)?;
    *target = converted;
    Ok(())
}

fn build_standard_registry() -> UnitRegistry {
    let mut registry = UnitRegistry::new();

    // Length: the only dimension with working conversions
    registry.add_unit("meters", LENGTH, &["m", "meter", "metre", "metres"]);
    registry.add_unit("microns", LENGTH, &["micron", "um", "micrometer", "micrometers"]);
    registry.add_unit("millimeters", LENGTH, &["mm", "millimeter", "millimetre", "millimetres"]);
    registry.add_unit("centimeters", LENGTH, &["cm", "centimeter", "centimetre", "centimetres"]);
    registry.add_unit("kilometers", LENGTH, &["km", "kilometer", "kilometre", "kilometres"]);
    registry.add_unit("feet", LENGTH, &["ft", "foot"]);
    registry.add_unit("inches", LENGTH, &["in", "inch"]);
    registry.add_conversion("microns", "meters", 1e-6);
    registry.add_conversion("millimeters", "meters", 1e-3);
    registry.add_conversion("centimeters", "meters", 1e-2);
    registry.add_conversion("kilometers", "meters", 1e3);
    registry.add_conversion("feet", "meters", 0.3048);
    registry.add_conversion("inches", "meters", 0.0254);

    // Known but unconverted
    registry.add_unit("square meters", AREA, &["m2", "m^2", "sq m"]);
    registry.add_unit("square feet", AREA, &["ft2", "ft^2", "sq ft"]);
    registry.add_unit("cubic meters", VOLUME, &["m3", "m^3"]);
    registry.add_unit("liters", VOLUME, &["l", "liter", "litre"]);
    registry.add_unit("kelvin", TEMPERATURE, &["k"]);
    registry.add_unit("celsius", TEMPERATURE, &["degc"]);
    registry.add_unit("fahrenheit", TEMPERATURE, &["degf"]);
    registry.add_unit("seconds", TIME, &["s", "sec", "second"]);
    registry.add_unit("minutes", TIME, &["min", "minute"]);
    registry.add_unit("hours", TIME, &["h", "hr", "hour"]);
    registry.add_unit("degrees", ANGLE, &["deg", "degree"]);
    registry.add_unit("radians", ANGLE, &["rad", "radian"]);
    registry.add_unit("kilograms", MASS, &["kg", "kilogram"]);
    registry.add_unit("grams", MASS, &["g", "gram"]);
    registry.add_unit("pounds", MASS, &["lb", "lbs", "pound"]);
    registry.add_unit("newtons", FORCE, &["n", "newton"]);
    registry.add_unit("pounds-force", FORCE, &["lbf"]);
    registry.add_unit("joules", ENERGY, &["j", "joule"]);
    registry.add_unit("kilowatt-hours", ENERGY, &["kwh"]);
    registry.add_unit("candela", LUMINOUS_INTENSITY, &["cd"]);

    registry
}
