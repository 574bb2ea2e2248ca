//! Coordinate reference system handling.
//!
//! [`ProjectionKernel`] is the capability seam for coordinate
//! transformation, mirroring the geometry kernel: callers resolve and
//! transform through the trait and never reach into projection math
//! directly. [`SphericalMercator`] covers the two systems the service
//! actually uses, WGS84 geographic coordinates (EPSG:4326) and Web Mercator
//! (EPSG:3857), with an exact identity for same-CRS requests.
//!
//! Every cross-CRS operation carries an explicit source and target
//! descriptor; there is no silent default.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, CoordsIter, Geometry, MapCoords};

use crate::constants::WEB_MERCATOR_RADIUS;
use crate::error::{InputError, KernelError};

/// An authority code naming a CRS definition, e.g. `EPSG:4326`.
///
/// Parsed from `"EPSG:4326"` or a bare `"4326"` (EPSG is assumed). Parsing
/// only checks the descriptor's shape; whether the code resolves is the
/// projection kernel's call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrsCode {
    /// Naming authority, normalized to upper case.
    pub authority: String,
    /// Code within the authority's namespace.
    pub code: String,
}

impl CrsCode {
    /// Convenience constructor for EPSG codes.
    #[must_use]
    pub fn epsg(code: u32) -> Self {
        Self {
            authority: "EPSG".to_string(),
            code: code.to_string(),
        }
    }
}

impl FromStr for CrsCode {
    type Err = InputError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let trimmed = descriptor.trim();
        if trimmed.is_empty() {
            return Err(InputError::BadCrs(descriptor.to_string()));
        }

        let (authority, code) = match trimmed.split_once(':') {
            Some((authority, code)) => (authority, code),
            None => ("EPSG", trimmed),
        };

        if authority.is_empty()
            || code.is_empty()
            || code.contains(':')
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(InputError::BadCrs(descriptor.to_string()));
        }

        Ok(Self {
            authority: authority.to_ascii_uppercase(),
            code: code.to_string(),
        })
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

/// Coordinate transformation capability.
pub trait ProjectionKernel: Send + Sync {
    /// Checks that a CRS descriptor names a definition this kernel knows.
    fn resolve(&self, crs: &CrsCode) -> Result<(), KernelError>;

    /// Transforms a geometry from `source` to `target` coordinates.
    ///
    /// Both descriptors are resolved before any coordinate math runs, so an
    /// unresolvable CRS fails the same way whether or not the geometry is
    /// empty.
    fn transform(
        &self,
        geometry: &Geometry<f64>,
        source: &CrsCode,
        target: &CrsCode,
    ) -> Result<Geometry<f64>, KernelError>;
}

const WGS84: &str = "4326";
const WEB_MERCATOR: &str = "3857";

/// Projection kernel for WGS84 <-> Web Mercator on the authalic sphere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SphericalMercator;

impl SphericalMercator {
    /// Creates a new projection kernel.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn forward(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: WEB_MERCATOR_RADIUS * c.x.to_radians(),
        y: WEB_MERCATOR_RADIUS
            * (std::f64::consts::FRAC_PI_4 + c.y.to_radians() / 2.0).tan().ln(),
    }
}

fn inverse(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (c.x / WEB_MERCATOR_RADIUS).to_degrees(),
        y: (2.0 * (c.y / WEB_MERCATOR_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2)
            .to_degrees(),
    }
}

impl ProjectionKernel for SphericalMercator {
    fn resolve(&self, crs: &CrsCode) -> Result<(), KernelError> {
        if crs.authority == "EPSG" && (crs.code == WGS84 || crs.code == WEB_MERCATOR) {
            Ok(())
        } else {
            Err(KernelError::UnknownCrs(crs.to_string()))
        }
    }

    fn transform(
        &self,
        geometry: &Geometry<f64>,
        source: &CrsCode,
        target: &CrsCode,
    ) -> Result<Geometry<f64>, KernelError> {
        self.resolve(source)?;
        self.resolve(target)?;

        if source == target {
            return Ok(geometry.clone());
        }

        let projected = if source.code == WGS84 {
            geometry.map_coords(forward)
        } else {
            geometry.map_coords(inverse)
        };

        // Latitudes at or beyond the poles project to non-finite values.
        if projected
            .coords_iter()
            .any(|c| !c.x.is_finite() || !c.y.is_finite())
        {
            return Err(KernelError::ProjectionDomain);
        }

        Ok(projected)
    }
}
