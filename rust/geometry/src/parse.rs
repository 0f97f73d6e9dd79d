// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed accessors over normalized entity values
//!
//! Every accessor names the offending property in its error so the message
//! recorded for a primitive points at the field to fix.

use crate::{GeometryError, Point3, Result, Vector3};
use serde_json::Value;

#[inline]
fn field<'a>(entity: &'a Value, key: &str) -> Option<&'a Value> {
    entity.get(key).filter(|v| !v.is_null())
}

/// Required number
pub fn number(entity: &Value, key: &str) -> Result<f64> {
    opt_number(entity, key)?.ok_or_else(|| GeometryError::MissingProperty(key.to_string()))
}

/// Optional number; present but non-numeric is an error
pub fn opt_number(entity: &Value, key: &str) -> Result<Option<f64>> {
    match field(entity, key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or_else(|| GeometryError::invalid(key, "expected a number")),
    }
}

pub fn number_or(entity: &Value, key: &str, default: f64) -> Result<f64> {
    Ok(opt_number(entity, key)?.unwrap_or(default))
}

/// Required number strictly greater than zero
pub fn positive(entity: &Value, key: &str) -> Result<f64> {
    let value = number(entity, key)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(GeometryError::invalid(key, format!("must be > 0, got {}", value)))
    }
}

/// Required non-negative integer
pub fn count(entity: &Value, key: &str) -> Result<usize> {
    let value = number(entity, key)?;
    if value >= 0.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(GeometryError::invalid(key, "expected a non-negative integer"))
    }
}

pub fn string<'a>(entity: &'a Value, key: &str) -> Result<&'a str> {
    field(entity, key)
        .ok_or_else(|| GeometryError::MissingProperty(key.to_string()))?
        .as_str()
        .ok_or_else(|| GeometryError::invalid(key, "expected a string"))
}

/// Coordinates from a 2 or 3 element array; a missing z is zero
pub fn coords(value: &Value, key: &str) -> Result<[f64; 3]> {
    let items = value
        .as_array()
        .filter(|items| items.len() == 2 || items.len() == 3)
        .ok_or_else(|| GeometryError::invalid(key, "expected an array of 2 or 3 numbers"))?;
    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item
            .as_f64()
            .filter(|n| n.is_finite())
            .ok_or_else(|| GeometryError::invalid(key, "coordinates must be numbers"))?;
    }
    Ok(out)
}

#[inline]
pub fn to_point(value: &Value, key: &str) -> Result<Point3<f64>> {
    let [x, y, z] = coords(value, key)?;
    Ok(Point3::new(x, y, z))
}

pub fn point(entity: &Value, key: &str) -> Result<Point3<f64>> {
    opt_point(entity, key)?.ok_or_else(|| GeometryError::MissingProperty(key.to_string()))
}

pub fn opt_point(entity: &Value, key: &str) -> Result<Option<Point3<f64>>> {
    field(entity, key).map(|v| to_point(v, key)).transpose()
}

pub fn opt_vector(entity: &Value, key: &str) -> Result<Option<Vector3<f64>>> {
    Ok(opt_point(entity, key)?.map(|p| p.coords))
}

/// Required list of points
pub fn points(entity: &Value, key: &str) -> Result<Vec<Point3<f64>>> {
    let value = field(entity, key).ok_or_else(|| GeometryError::MissingProperty(key.to_string()))?;
    point_list(value, key)
}

pub fn point_list(value: &Value, key: &str) -> Result<Vec<Point3<f64>>> {
    value
        .as_array()
        .ok_or_else(|| GeometryError::invalid(key, "expected an array of points"))?
        .iter()
        .map(|p| to_point(p, key))
        .collect()
}

/// Required list of numbers
pub fn numbers(entity: &Value, key: &str) -> Result<Vec<f64>> {
    let value = field(entity, key).ok_or_else(|| GeometryError::MissingProperty(key.to_string()))?;
    number_list(value, key)
}

pub fn opt_numbers(entity: &Value, key: &str) -> Result<Option<Vec<f64>>> {
    field(entity, key).map(|v| number_list(v, key)).transpose()
}

pub fn number_list(value: &Value, key: &str) -> Result<Vec<f64>> {
    value
        .as_array()
        .ok_or_else(|| GeometryError::invalid(key, "expected an array of numbers"))?
        .iter()
        .map(|n| {
            n.as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| GeometryError::invalid(key, "expected an array of numbers"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_accepts_2d() {
        let entity = json!({"origin": [1, 2]});
        assert_eq!(point(&entity, "origin").unwrap(), Point3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_missing_and_invalid() {
        let entity = json!({"radius": "big", "origin": null});
        assert!(matches!(number(&entity, "height"), Err(GeometryError::MissingProperty(_))));
        assert!(matches!(number(&entity, "radius"), Err(GeometryError::InvalidProperty { .. })));
        assert_eq!(opt_point(&entity, "origin").unwrap(), None);
    }

    #[test]
    fn test_positive() {
        assert!(positive(&json!({"r": 0}), "r").is_err());
        assert_eq!(positive(&json!({"r": 2.5}), "r").unwrap(), 2.5);
    }

    #[test]
    fn test_count() {
        assert_eq!(count(&json!({"degree": 3}), "degree").unwrap(), 3);
        assert!(count(&json!({"degree": 1.5}), "degree").is_err());
        assert!(count(&json!({"degree": -1}), "degree").is_err());
    }

    #[test]
    fn test_point_list() {
        let entity = json!({"points": [[0, 0, 0], [1, 0, 0]], "bad": [[0, 0, 0], [1]]});
        assert_eq!(points(&entity, "points").unwrap().len(), 2);
        assert!(points(&entity, "bad").is_err());
    }
}
