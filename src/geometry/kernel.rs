//! Geometry kernel capability.
//!
//! [`GeometryKernel`] is the seam between the service boundary and the
//! geometry engine: handlers and the batch pipeline only ever talk to the
//! trait. [`PlanarKernel`] is the production implementation, backed by the
//! `geo` crate. All operations are pure, synchronous and side-effect-free,
//! so a single shared instance serves concurrent requests.

use geo::{Area, BooleanOps, Geometry, LineString, MultiPolygon, Polygon, Validation};

use super::buffer;
use crate::error::KernelError;

/// Planar geometry operations exposed to the service boundary.
pub trait GeometryKernel: Send + Sync {
    /// Union of the polygonal content of two geometries.
    fn union(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Result<Geometry<f64>, KernelError>;

    /// Union of the polygonal content of many geometries.
    ///
    /// Unlike the binary overlay operations this accepts inputs without any
    /// areal content and yields an empty result for them, matching the
    /// collection-union semantics of the batch pipeline.
    fn unary_union(&self, parts: &[Geometry<f64>]) -> Result<Geometry<f64>, KernelError>;

    /// Intersection of the polygonal content of two geometries.
    fn intersection(
        &self,
        a: &Geometry<f64>,
        b: &Geometry<f64>,
    ) -> Result<Geometry<f64>, KernelError>;

    /// Difference of the polygonal content of two geometries (`a - b`).
    fn difference(
        &self,
        a: &Geometry<f64>,
        b: &Geometry<f64>,
    ) -> Result<Geometry<f64>, KernelError>;

    /// Dilates a geometry by `distance`, in the units of its coordinate
    /// plane. Distance zero is the identity; negative distances are
    /// unsupported.
    fn buffer(&self, geometry: &Geometry<f64>, distance: f64)
        -> Result<Geometry<f64>, KernelError>;

    /// Planar unsigned area.
    fn area(&self, geometry: &Geometry<f64>) -> f64;

    /// Planar length of all linear components, including polygon ring
    /// perimeters.
    fn length(&self, geometry: &Geometry<f64>) -> f64;

    /// Topological validity check.
    fn is_valid(&self, geometry: &Geometry<f64>) -> bool;
}

/// Production kernel backed by the `geo` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanarKernel;

impl PlanarKernel {
    /// Creates a new planar kernel.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl GeometryKernel for PlanarKernel {
    fn union(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Result<Geometry<f64>, KernelError> {
        let (pa, pb) = (polygonal("union", a)?, polygonal("union", b)?);
        Ok(Geometry::MultiPolygon(pa.union(&pb)))
    }

    fn unary_union(&self, parts: &[Geometry<f64>]) -> Result<Geometry<f64>, KernelError> {
        let mut polygons = Vec::new();
        for part in parts {
            collect_polygons(part, &mut polygons);
        }
        let union = polygons
            .into_iter()
            .fold(MultiPolygon(Vec::new()), |acc, polygon| {
                acc.union(&MultiPolygon(vec![polygon]))
            });
        Ok(Geometry::MultiPolygon(union))
    }

    fn intersection(
        &self,
        a: &Geometry<f64>,
        b: &Geometry<f64>,
    ) -> Result<Geometry<f64>, KernelError> {
        let (pa, pb) = (
            polygonal("intersection", a)?,
            polygonal("intersection", b)?,
        );
        Ok(Geometry::MultiPolygon(pa.intersection(&pb)))
    }

    fn difference(
        &self,
        a: &Geometry<f64>,
        b: &Geometry<f64>,
    ) -> Result<Geometry<f64>, KernelError> {
        let (pa, pb) = (polygonal("difference", a)?, polygonal("difference", b)?);
        Ok(Geometry::MultiPolygon(pa.difference(&pb)))
    }

    fn buffer(
        &self,
        geometry: &Geometry<f64>,
        distance: f64,
    ) -> Result<Geometry<f64>, KernelError> {
        if distance < 0.0 {
            return Err(KernelError::Unsupported(
                "negative buffer distance".to_string(),
            ));
        }
        if distance == 0.0 {
            return Ok(geometry.clone());
        }
        Ok(Geometry::MultiPolygon(buffer::dilate(geometry, distance)))
    }

    fn area(&self, geometry: &Geometry<f64>) -> f64 {
        geometry.unsigned_area()
    }

    fn length(&self, geometry: &Geometry<f64>) -> f64 {
        linear_length(geometry)
    }

    fn is_valid(&self, geometry: &Geometry<f64>) -> bool {
        geometry.is_valid()
    }
}

/// Extracts the polygonal content of a geometry for an overlay operation.
///
/// An operand with no areal content cannot participate in an overlay; that
/// is a kernel error, not an input error, because the payload itself was
/// well-formed.
fn polygonal(op: &'static str, geometry: &Geometry<f64>) -> Result<MultiPolygon<f64>, KernelError> {
    let mut polygons = Vec::new();
    collect_polygons(geometry, &mut polygons);
    if polygons.is_empty() {
        return Err(KernelError::NonAreal { op });
    }
    Ok(MultiPolygon(polygons))
}

fn collect_polygons(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(polygon) => out.push(polygon.clone()),
        Geometry::MultiPolygon(multi) => out.extend(multi.0.iter().cloned()),
        Geometry::Rect(rect) => out.push(rect.to_polygon()),
        Geometry::Triangle(triangle) => out.push(triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => {
            for child in &collection.0 {
                collect_polygons(child, out);
            }
        }
        _ => {}
    }
}

fn line_string_length(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|segment| segment.dx().hypot(segment.dy()))
        .sum()
}

fn polygon_perimeter(polygon: &Polygon<f64>) -> f64 {
    line_string_length(polygon.exterior())
        + polygon
            .interiors()
            .iter()
            .map(line_string_length)
            .sum::<f64>()
}

fn linear_length(geometry: &Geometry<f64>) -> f64 {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => 0.0,
        Geometry::Line(line) => line.dx().hypot(line.dy()),
        Geometry::LineString(line) => line_string_length(line),
        Geometry::MultiLineString(multi) => multi.0.iter().map(line_string_length).sum(),
        Geometry::Polygon(polygon) => polygon_perimeter(polygon),
        Geometry::MultiPolygon(multi) => multi.0.iter().map(polygon_perimeter).sum(),
        Geometry::Rect(rect) => polygon_perimeter(&rect.to_polygon()),
        Geometry::Triangle(triangle) => polygon_perimeter(&triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => collection.0.iter().map(linear_length).sum(),
    }
}
