//! Coordinate transformation between WGS84 and raster reference systems

use geo::{Coord, MapCoords, MultiPolygon};
use hydromap_core::error::{HydroError, Result};
use hydromap_core::models::Crs;
use proj::Proj;

/// Check if two CRS are the same
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    crs1.epsg == crs2.epsg
}

/// A reusable point transformation; identity when both CRS match
pub struct CoordinateTransform {
    from: Crs,
    to: Crs,
    proj: Option<Proj>,
}

impl std::fmt::Debug for CoordinateTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateTransform")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("identity", &self.proj.is_none())
            .finish()
    }
}

impl CoordinateTransform {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        if crs_match(from, to) {
            return Ok(Self { from: from.clone(), to: to.clone(), proj: None });
        }

        let proj = Proj::new_known_crs(&from.authority(), &to.authority(), None).map_err(|e| {
            HydroError::Projection {
                from: from.authority(),
                to: to.authority(),
                reason: format!("Failed to create projection: {}", e),
            }
        })?;

        Ok(Self { from: from.clone(), to: to.clone(), proj: Some(proj) })
    }

    pub fn is_identity(&self) -> bool {
        self.proj.is_none()
    }

    /// Transform a single (x, y) pair; geographic coordinates are (lon, lat)
    pub fn convert(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let Some(proj) = &self.proj else {
            return Ok((x, y));
        };

        let (tx, ty) = proj.convert((x, y)).map_err(|e| HydroError::Projection {
            from: self.from.authority(),
            to: self.to.authority(),
            reason: format!("Projection failed: {}", e),
        })?;

        if !tx.is_finite() || !ty.is_finite() {
            return Err(HydroError::Projection {
                from: self.from.authority(),
                to: self.to.authority(),
                reason: format!("({}, {}) has no finite image", x, y),
            });
        }
        Ok((tx, ty))
    }

    /// Transform every vertex of a multipolygon
    pub fn convert_multipolygon(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|coord| {
            self.convert(coord.x, coord.y).map(|(x, y)| Coord { x, y })
        })
    }
}

/// WGS84 longitude/latitude into the raster's CRS
pub fn to_raster_crs(lon: f64, lat: f64, raster_crs: &Crs) -> Result<(f64, f64)> {
    CoordinateTransform::new(&Crs::wgs84(), raster_crs)?.convert(lon, lat)
}

/// Raster CRS coordinates back to WGS84 longitude/latitude
pub fn to_geographic(x: f64, y: f64, raster_crs: &Crs) -> Result<(f64, f64)> {
    CoordinateTransform::new(raster_crs, &Crs::wgs84())?.convert(x, y)
}

/// Reproject a multipolygon from one CRS to another
pub fn reproject_multipolygon(
    geometry: &MultiPolygon<f64>,
    from_crs: &Crs,
    to_crs: &Crs,
) -> Result<MultiPolygon<f64>> {
    CoordinateTransform::new(from_crs, to_crs)?.convert_multipolygon(geometry)
}
