//! Error taxonomy for the geometry service.
//!
//! Every failure a request can produce falls into one of three classes:
//! input errors (the payload is structurally wrong and never reached a
//! kernel), kernel errors (a geometry or projection operation could not be
//! carried out), and internal errors (everything else). The web boundary
//! maps these to distinct HTTP statuses so callers can tell a bad request
//! apart from a failed computation.

use thiserror::Error;

/// A structurally invalid request payload.
///
/// Input errors are raised before any kernel call is made.
#[derive(Debug, Error)]
pub enum InputError {
    /// The request envelope could not be deserialized.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The geometry payload is not valid GeoJSON.
    #[error("malformed GeoJSON geometry: {0}")]
    MalformedGeoJson(String),

    /// A coordinate position has the wrong number of components.
    #[error("position has {0} components, expected 2 or 3")]
    BadPositionArity(usize),

    /// A coordinate value is NaN or infinite.
    #[error("coordinate value is not a finite number")]
    NonFiniteCoordinate,

    /// A polygon ring does not end at its starting position.
    #[error("polygon ring is not closed")]
    UnclosedRing,

    /// A polygon ring has too few positions.
    #[error("polygon ring has {0} positions, at least 4 are required")]
    ShortRing(usize),

    /// A line string has too few positions.
    #[error("line string has {0} positions, at least 2 are required")]
    ShortLineString(usize),

    /// An operation was invoked without a field it requires.
    #[error("operation '{op}' requires the '{field}' field")]
    MissingField {
        /// Operation selector from the request.
        op: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The buffer distance is NaN or infinite.
    #[error("buffer distance must be a finite number")]
    NonFiniteDistance,

    /// A CRS descriptor could not be parsed as an authority code.
    #[error("malformed CRS descriptor: {0:?}")]
    BadCrs(String),
}

/// A failure inside the geometry or projection kernel.
///
/// Kernel errors are deterministic: retrying the same request would fail
/// identically, so they are reported to the caller and never retried.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The CRS descriptor is well-formed but names no known definition.
    #[error("unresolvable CRS: {0}")]
    UnknownCrs(String),

    /// A projected coordinate fell outside the projection's domain.
    #[error("coordinate outside projection domain")]
    ProjectionDomain,

    /// An overlay operation was applied to geometry with no areal content.
    #[error("operation '{op}' requires polygonal geometry")]
    NonAreal {
        /// The overlay operation that was requested.
        op: &'static str,
    },

    /// The kernel does not support the requested computation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Top-level service error.
#[derive(Debug, Error)]
pub enum Error {
    /// Structurally invalid payload; reported as a client error.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Kernel failure; reported as a distinguishable client-visible error.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// Anything not classified above; reported as a server error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Short classification tag carried in error responses.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Kernel(_) => "kernel",
            Self::Internal(_) => "internal",
        }
    }
}
