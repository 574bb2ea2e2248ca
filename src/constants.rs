//! Application-wide constants.
//!
//! This module defines constants used throughout the service,
//! including network defaults and the fixed parameters of the
//! buffer/intersect pipeline.

/// The service name reported by the root endpoint.
pub const SERVICE_NAME: &str = "geo-buffer-intersect-batch";

/// Default TCP port, overridable via the `PORT` environment variable.
pub const DEFAULT_PORT: u16 = 10000;

/// Default host to bind the listener to.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default buffer distance for the batch pipeline, in kilometres.
pub const DEFAULT_BUFFER_KM: f64 = 10.0;

/// Sphere radius used by the Web Mercator projection (EPSG:3857), in metres.
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Number of segments used to approximate a full circular arc when buffering.
pub const ARC_SEGMENTS: usize = 64;
