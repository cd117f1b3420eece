//! Hydromap Watershed - Delineation use cases
//!
//! This crate implements pour-point snapping, upstream tracing over D8 flow
//! directions and watershed statistics, and orchestrates them together with the
//! result cache.

pub mod d8;
pub mod pipeline;
pub mod snap;
pub mod statistics;
pub mod trace;

pub use d8::D8;
pub use pipeline::{Delineator, DEFAULT_SNAP_RADIUS};
pub use snap::{snap_pour_point, snap_to_accumulation};
pub use statistics::{compute_statistics, summarize_elevation};
pub use trace::trace_upstream;
