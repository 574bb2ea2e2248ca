//! GeoJSON Geometry Service Library
//!
//! This library provides the core functionality for the geobatch service:
//! structural validation of GeoJSON payloads, geometry and projection
//! kernels behind capability traits, a framework-independent operation
//! executor, the buffer/intersect batch pipeline, and the axum web
//! boundary that ties them together.

// Module declarations
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod projection;
pub mod services;
pub mod web;
