//! Port trait definitions
//!
//! These traits define the interfaces that adapters must implement.

pub mod raster;

pub use raster::{FileRasterSource, MemoryRasterSource, RasterSource};
