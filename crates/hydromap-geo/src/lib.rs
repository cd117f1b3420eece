//! Hydromap Geo - CRS transforms, measurement, and polygonization
//!
//! This crate handles the geospatial side of delineation: moving points and
//! polygons between reference systems, tracing mask boundaries into polygons,
//! and measuring them in an equal-area projection.

pub mod models;
pub mod polygonize;
pub mod spatial;
pub mod transform;

pub use polygonize::{merge_parts, polygonize};
pub use spatial::{haversine_distance, measure_equal_area, meters_per_degree, EqualAreaMeasure};
pub use transform::{reproject_multipolygon, to_geographic, to_raster_crs, CoordinateTransform};
