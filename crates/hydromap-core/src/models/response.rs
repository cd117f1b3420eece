//! Request and response payloads of the delineation engine.

use geojson::Feature;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::point::LonLat;
use super::watershed::WatershedStatistics;
use crate::error::{HydroError, Result};

/// Largest accepted snap radius, in meters
pub const MAX_SNAP_RADIUS: i64 = 1000;

/// A delineation request as received from a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelineationRequest {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub snap_to_stream: Option<bool>,
    #[serde(default)]
    pub snap_radius: Option<i64>,
}

impl DelineationRequest {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, snap_to_stream: None, snap_radius: None }
    }

    pub fn with_snapping(mut self, snap_to_stream: bool, snap_radius: Option<i64>) -> Self {
        self.snap_to_stream = Some(snap_to_stream);
        self.snap_radius = snap_radius;
        self
    }

    /// Check coordinate and radius ranges
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(HydroError::invalid_input("lat", "must be between -90 and 90"));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(HydroError::invalid_input("lon", "must be between -180 and 180"));
        }
        if let Some(radius) = self.snap_radius {
            validate_snap_radius(radius)?;
        }
        Ok(())
    }

    pub fn location(&self) -> LonLat {
        LonLat::new(self.lon, self.lat)
    }
}

/// Reject snap radii outside `0..=1000` meters
pub fn validate_snap_radius(radius: i64) -> Result<u32> {
    if (0..=MAX_SNAP_RADIUS).contains(&radius) {
        Ok(radius as u32)
    } else {
        Err(HydroError::invalid_input(
            "snap_radius",
            format!("must be between 0 and {} meters", MAX_SNAP_RADIUS),
        ))
    }
}

/// Timing and provenance of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Seconds spent serving this request
    pub processing_time: f64,
    /// Radius used for snapping; `None` when snapping was disabled
    pub snap_radius: Option<u32>,
    pub from_cache: bool,
}

/// Full delineation result; also the cached value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelineationResponse {
    /// Watershed polygon with statistics as properties
    pub watershed: Feature,
    /// Pour point actually used, with snapping details
    pub pour_point: Feature,
    pub statistics: WatershedStatistics,
    pub metadata: ResponseMetadata,
}

impl DelineationResponse {
    /// Reuse a cached response, replacing only the timing and cache flag
    pub fn hydrate(mut self, processing_time: f64) -> Self {
        self.metadata.processing_time = processing_time;
        self.metadata.from_cache = true;
        self
    }
}

/// Presence of one input raster on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub path: PathBuf,
    pub exists: bool,
}

impl FileStatus {
    pub fn probe(path: &Path) -> Self {
        Self { path: path.to_path_buf(), exists: path.exists() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterFiles {
    pub dem: FileStatus,
    pub flow_direction: FileStatus,
    pub flow_accumulation: FileStatus,
}

/// Readiness report of the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// True when all three rasters exist
    pub ready: bool,
    pub files: RasterFiles,
    pub cache_enabled: bool,
}

impl EngineStatus {
    pub fn new(files: RasterFiles, cache_enabled: bool) -> Self {
        let ready = files.dem.exists && files.flow_direction.exists && files.flow_accumulation.exists;
        Self { ready, files, cache_enabled }
    }
}
