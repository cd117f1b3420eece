//! Raster file formats understood by the engine

pub mod geotiff;

pub use geotiff::{read_geotiff, read_geotiff_from_buffer, read_geotiff_info, read_geotiff_window, write_geotiff};
