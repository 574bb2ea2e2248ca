//! Structural validation of GeoJSON geometry.
//!
//! Validation runs on the decoded interchange representation, before any
//! conversion to kernel types, so malformed input fails fast with a client
//! error and never reaches the native geometry code. Checks cover the
//! coordinate invariants of the data model: finite ordered pairs/triples,
//! closed polygon rings, and minimum position counts.

use geojson::{Geometry, Value};

use crate::error::InputError;

/// Validates a GeoJSON geometry structurally.
///
/// # Errors
///
/// Returns the first [`InputError`] found, or `Ok(())` for a well-formed
/// geometry.
pub fn check_geometry(geometry: &Geometry) -> Result<(), InputError> {
    check_value(&geometry.value)
}

fn check_value(value: &Value) -> Result<(), InputError> {
    match value {
        Value::Point(position) => check_position(position),
        Value::MultiPoint(positions) => positions.iter().try_for_each(|p| check_position(p)),
        Value::LineString(line) => check_line_string(line),
        Value::MultiLineString(lines) => lines.iter().try_for_each(|l| check_line_string(l)),
        Value::Polygon(rings) => rings.iter().try_for_each(|r| check_ring(r)),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .try_for_each(|rings| rings.iter().try_for_each(|r| check_ring(r))),
        Value::GeometryCollection(geometries) => {
            geometries.iter().try_for_each(check_geometry)
        }
    }
}

fn check_position(position: &[f64]) -> Result<(), InputError> {
    if position.len() != 2 && position.len() != 3 {
        return Err(InputError::BadPositionArity(position.len()));
    }
    if position.iter().any(|component| !component.is_finite()) {
        return Err(InputError::NonFiniteCoordinate);
    }
    Ok(())
}

fn check_line_string(line: &[Vec<f64>]) -> Result<(), InputError> {
    if line.len() < 2 {
        return Err(InputError::ShortLineString(line.len()));
    }
    line.iter().try_for_each(|p| check_position(p))
}

fn check_ring(ring: &[Vec<f64>]) -> Result<(), InputError> {
    if ring.len() < 4 {
        return Err(InputError::ShortRing(ring.len()));
    }
    ring.iter().try_for_each(|p| check_position(p))?;

    // Finite coordinates were checked above, so slice equality is exact.
    if ring.first() != ring.last() {
        return Err(InputError::UnclosedRing);
    }
    Ok(())
}
