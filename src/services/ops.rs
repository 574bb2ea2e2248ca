//! Framework-independent operation core.
//!
//! [`Executor`] is the pure function set `(operation, payload) -> result`:
//! it validates structurally, delegates to the injected kernels, and
//! packages the outcome. It has no knowledge of HTTP, so it can be wired
//! into any routing layer and exercised directly in tests with mock
//! kernels.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Error, InputError};
use crate::geometry::{self, validate, GeometryKernel};
use crate::projection::{CrsCode, ProjectionKernel};

/// Operation selector carried in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Planar unsigned area of the geometry.
    Area,
    /// Planar length of the geometry's linear components.
    Length,
    /// Dilate the geometry by `distance`.
    Buffer,
    /// Union with `other`.
    Union,
    /// Intersection with `other`.
    Intersection,
    /// Difference against `other`.
    Difference,
    /// Topological validity check.
    IsValid,
    /// Reproject from `source_crs` to `target_crs`.
    Transform,
}

impl Operation {
    /// Selector name as it appears on the wire.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Area => "area",
            Self::Length => "length",
            Self::Buffer => "buffer",
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::Difference => "difference",
            Self::IsValid => "is_valid",
            Self::Transform => "transform",
        }
    }
}

/// A single geometry operation request.
#[derive(Debug, Deserialize)]
pub struct OperationRequest {
    /// Operation selector.
    pub op: Operation,
    /// Primary geometry operand.
    pub geometry: geojson::Geometry,
    /// Second operand for overlay operations.
    #[serde(default)]
    pub other: Option<geojson::Geometry>,
    /// Buffer distance, in the units of the geometry's coordinate plane.
    #[serde(default)]
    pub distance: Option<f64>,
    /// Source CRS descriptor for `transform`.
    #[serde(default)]
    pub source_crs: Option<String>,
    /// Target CRS descriptor for `transform`.
    #[serde(default)]
    pub target_crs: Option<String>,
}

/// Result of a successful operation.
#[derive(Debug)]
pub enum Outcome {
    /// A geometry result, e.g. from an overlay or transform.
    Geometry(geojson::Geometry),
    /// A scalar result, e.g. an area or length.
    Scalar(f64),
    /// A boolean result, e.g. from a validity check.
    Boolean(bool),
}

impl Outcome {
    /// Serializes the outcome for the `result` field of a response.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Geometry(geometry) => json!(geometry),
            Self::Scalar(value) => json!(value),
            Self::Boolean(value) => json!(value),
        }
    }
}

/// Executes operations against injected kernel capabilities.
///
/// Kernels are built once at startup and shared read-only across requests;
/// the executor holds no per-request state.
pub struct Executor {
    geometry: Arc<dyn GeometryKernel>,
    projection: Arc<dyn ProjectionKernel>,
}

impl Executor {
    /// Creates an executor over the given kernels.
    pub fn new(geometry: Arc<dyn GeometryKernel>, projection: Arc<dyn ProjectionKernel>) -> Self {
        Self {
            geometry,
            projection,
        }
    }

    /// The geometry kernel this executor delegates to.
    #[must_use]
    pub fn geometry_kernel(&self) -> &Arc<dyn GeometryKernel> {
        &self.geometry
    }

    /// The projection kernel this executor delegates to.
    #[must_use]
    pub fn projection_kernel(&self) -> &Arc<dyn ProjectionKernel> {
        &self.projection
    }

    /// Runs one operation.
    ///
    /// # Errors
    ///
    /// Returns an input error for structurally invalid payloads (before any
    /// kernel call) and a kernel error when the computation itself fails.
    pub fn execute(&self, request: &OperationRequest) -> Result<Outcome, Error> {
        validate::check_geometry(&request.geometry)?;
        let geom = geometry::to_geo(&request.geometry)?;
        let op = request.op.name();

        match request.op {
            Operation::Area => Ok(Outcome::Scalar(self.geometry.area(&geom))),
            Operation::Length => Ok(Outcome::Scalar(self.geometry.length(&geom))),
            Operation::IsValid => Ok(Outcome::Boolean(self.geometry.is_valid(&geom))),
            Operation::Buffer => {
                let distance = request
                    .distance
                    .ok_or(InputError::MissingField {
                        op,
                        field: "distance",
                    })?;
                if !distance.is_finite() {
                    return Err(InputError::NonFiniteDistance.into());
                }
                let buffered = self.geometry.buffer(&geom, distance)?;
                Ok(Outcome::Geometry(geometry::to_geojson(&buffered)))
            }
            Operation::Union | Operation::Intersection | Operation::Difference => {
                let other_geojson = request
                    .other
                    .as_ref()
                    .ok_or(InputError::MissingField { op, field: "other" })?;
                validate::check_geometry(other_geojson)?;
                let other = geometry::to_geo(other_geojson)?;

                let result = match request.op {
                    Operation::Union => self.geometry.union(&geom, &other)?,
                    Operation::Intersection => self.geometry.intersection(&geom, &other)?,
                    _ => self.geometry.difference(&geom, &other)?,
                };
                Ok(Outcome::Geometry(geometry::to_geojson(&result)))
            }
            Operation::Transform => {
                let source = crs_field(request.source_crs.as_deref(), op, "source_crs")?;
                let target = crs_field(request.target_crs.as_deref(), op, "target_crs")?;
                let transformed = self.projection.transform(&geom, &source, &target)?;
                Ok(Outcome::Geometry(geometry::to_geojson(&transformed)))
            }
        }
    }
}

/// Parses a required CRS descriptor field.
///
/// Omission of either descriptor on a cross-CRS operation is a request
/// error, never a silent default.
fn crs_field(
    value: Option<&str>,
    op: &'static str,
    field: &'static str,
) -> Result<CrsCode, InputError> {
    value
        .ok_or(InputError::MissingField { op, field })?
        .parse()
}
