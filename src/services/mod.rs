//! Service layer for the geometry business logic.
//!
//! This module contains the framework-independent operation core and the
//! buffer/intersect batch pipeline, both expressed against the kernel
//! capability traits so they can run under any routing layer.

pub mod batch;
pub mod ops;

// Re-export commonly used types
pub use batch::{BatchItem, BatchRequest, BufferIntersect};
pub use ops::{Executor, Operation, OperationRequest, Outcome};
