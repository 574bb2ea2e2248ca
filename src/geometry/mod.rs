//! Geometry handling: structural validation, kernel capability, buffering.
//!
//! The kernel is modelled as a capability trait so the web boundary and the
//! batch pipeline never call the underlying geometry library directly; tests
//! can substitute a mock kernel.

mod buffer;
pub mod kernel;
pub mod validate;

pub use kernel::{GeometryKernel, PlanarKernel};

use crate::error::InputError;

/// Converts a validated GeoJSON geometry into the kernel representation.
///
/// # Errors
///
/// Returns an input error when the GeoJSON value cannot be expressed as a
/// kernel geometry.
pub fn to_geo(geometry: &geojson::Geometry) -> Result<geo::Geometry<f64>, InputError> {
    geo::Geometry::<f64>::try_from(geometry.value.clone())
        .map_err(|e| InputError::MalformedGeoJson(e.to_string()))
}

/// Serializes a kernel geometry back into the GeoJSON interchange format.
#[must_use]
pub fn to_geojson(geometry: &geo::Geometry<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(geometry))
}
