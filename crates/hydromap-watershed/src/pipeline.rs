//! The delineation pipeline: validate, snap, trace, polygonize, measure.
//!
//! [`Delineator`] drives one request end to end and consults the result
//! cache first. Raster work runs on the blocking pool.

use std::sync::Arc;
use std::time::Instant;

use geo::Geometry;
use hydromap_core::config::HydroConfig;
use hydromap_core::error::{HydroError, Result};
use hydromap_core::models::{
    validate_snap_radius, Crs, DelineationRequest, DelineationResponse, EngineStatus, FileStatus,
    LonLat, PourPoint, RasterFiles, RasterLayer, ResponseMetadata, WatershedStatistics,
};
use hydromap_core::ports::RasterSource;
use hydromap_geo::models::to_feature;
use hydromap_geo::{merge_parts, polygonize, reproject_multipolygon, to_raster_crs};
use hydromap_store::ResultCache;

use crate::snap::snap_pour_point;
use crate::statistics::compute_statistics;
use crate::trace::trace_upstream;

/// Snap radius used when neither the request nor the configuration names one
pub const DEFAULT_SNAP_RADIUS: u32 = 100;

/// Delineation orchestrator: snap, cache lookup, trace, polygonize, measure, store.
///
/// Holds no per-request state; concurrent calls share only the raster source
/// and the result cache.
pub struct Delineator {
    rasters: Arc<dyn RasterSource>,
    cache: Option<Arc<dyn ResultCache>>,
    snap_to_stream: bool,
    default_snap_radius: u32,
}

impl Delineator {
    /// Create a delineator; pass `None` as `cache` to disable result caching
    pub fn new(rasters: Arc<dyn RasterSource>, cache: Option<Arc<dyn ResultCache>>) -> Self {
        Self {
            rasters,
            cache,
            snap_to_stream: true,
            default_snap_radius: DEFAULT_SNAP_RADIUS,
        }
    }

    /// Server-side defaults for requests that leave snapping unspecified
    pub fn with_snap_defaults(mut self, snap_to_stream: bool, snap_radius: u32) -> Self {
        self.snap_to_stream = snap_to_stream;
        self.default_snap_radius = snap_radius;
        self
    }

    pub fn from_config(
        config: &HydroConfig,
        rasters: Arc<dyn RasterSource>,
        cache: Option<Arc<dyn ResultCache>>,
    ) -> Self {
        Self::new(rasters, cache)
            .with_snap_defaults(config.snap_to_stream.value, config.default_snap_radius.value)
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Delineate the watershed draining to the requested point
    pub async fn delineate(&self, request: DelineationRequest) -> Result<DelineationResponse> {
        let start = Instant::now();
        request.validate()?;

        let snap_to_stream = request.snap_to_stream.unwrap_or(self.snap_to_stream);
        let snap_radius = match request.snap_radius {
            Some(radius) => validate_snap_radius(radius)?,
            None => self.default_snap_radius,
        };

        tracing::info!(
            lat = request.lat,
            lon = request.lon,
            snap_to_stream,
            snap_radius,
            "Delineation requested"
        );

        // Step 1: Snap the pour point
        let pour_point = if snap_to_stream {
            let rasters = Arc::clone(&self.rasters);
            let location = request.location();
            run_blocking(move || snap_pour_point(rasters.as_ref(), location, snap_radius)).await?
        } else {
            PourPoint::without_snapping(request.location())
        };

        // Step 2: Cache lookup on the snapped location
        let cache_key = pour_point.cache_key();
        if let Some(cached) = self.lookup(&cache_key).await {
            let elapsed = start.elapsed().as_secs_f64();
            tracing::info!(key = %cache_key, processing_time = elapsed, "Served from cache");
            return Ok(cached.hydrate(elapsed));
        }

        // Step 3: Trace, polygonize and measure
        let rasters = Arc::clone(&self.rasters);
        let outlet = pour_point.effective();
        let (geometry, statistics) = run_blocking(move || delineate_at(rasters.as_ref(), outlet)).await?;

        // Step 4: Build the response
        let response = DelineationResponse {
            watershed: to_feature(&geometry, statistics.to_properties()),
            pour_point: pour_point.to_feature(),
            statistics,
            metadata: ResponseMetadata {
                processing_time: start.elapsed().as_secs_f64(),
                snap_radius: snap_to_stream.then_some(snap_radius),
                from_cache: false,
            },
        };

        tracing::info!(
            key = %cache_key,
            num_cells = response.statistics.num_cells,
            area_km2 = response.statistics.area_km2,
            processing_time = response.metadata.processing_time,
            "Watershed delineated"
        );

        // Step 5: Store
        self.store(&cache_key, &response).await;
        Ok(response)
    }

    /// Report which rasters are present
    pub fn status(&self) -> EngineStatus {
        let probe = |layer| FileStatus {
            path: self.rasters.location(layer),
            exists: self.rasters.exists(layer),
        };
        EngineStatus::new(
            RasterFiles {
                dem: probe(RasterLayer::Dem),
                flow_direction: probe(RasterLayer::FlowDirection),
                flow_accumulation: probe(RasterLayer::FlowAccumulation),
            },
            self.cache_enabled(),
        )
    }

    /// Drop every cached result; returns how many entries were removed
    pub async fn clear_cache(&self) -> Result<usize> {
        match &self.cache {
            Some(cache) => {
                let removed = cache.clear().await?;
                tracing::info!(removed, backend = cache.backend_name(), "Cleared result cache");
                Ok(removed)
            }
            None => Ok(0),
        }
    }

    async fn lookup(&self, key: &str) -> Option<DelineationResponse> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(hit)) => {
                tracing::debug!(key, backend = cache.backend_name(), "Cache hit");
                Some(hit)
            }
            Ok(None) => {
                tracing::debug!(key, backend = cache.backend_name(), "Cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &str, response: &DelineationResponse) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Err(e) = cache.put(key, response).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }
}

/// Everything after snapping; runs on the blocking pool
fn delineate_at(rasters: &dyn RasterSource, outlet: LonLat) -> Result<(Geometry<f64>, WatershedStatistics)> {
    let flow_dir = rasters.open_flow_direction()?;
    let crs = flow_dir.crs().clone();

    let (x, y) = to_raster_crs(outlet.lon, outlet.lat, &crs)?;
    let (row, col) = flow_dir.locate(x, y)?;

    let mask = trace_upstream(&flow_dir, row, col)?;
    let polygons = polygonize(&mask, flow_dir.transform())?;
    drop(flow_dir);

    let statistics = compute_statistics(&mask, &polygons, &crs, rasters.open(RasterLayer::Dem))?;
    let geographic = reproject_multipolygon(&polygons, &crs, &Crs::wgs84())?;

    Ok((merge_parts(geographic), statistics))
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| HydroError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydromap_core::models::{GeoTransform, Raster};
    use hydromap_core::ports::MemoryRasterSource;
    use hydromap_core::ErrorCategory;
    use hydromap_store::MemoryResultCache;

    fn source() -> MemoryRasterSource {
        let fdir = Raster::from_rows(vec![
            vec![0.0, 4.0, 0.0],
            vec![1.0, 0.0, 16.0],
            vec![0.0, 64.0, 0.0],
        ])
        .unwrap()
        .with_transform(GeoTransform::new(-77.0, 39.0, 0.001, -0.001))
        .with_nodata(0.0);
        MemoryRasterSource::new().with_layer(RasterLayer::FlowDirection, fdir)
    }

    fn delineator(source: MemoryRasterSource) -> Delineator {
        Delineator::new(Arc::new(source), None).with_snap_defaults(false, 100)
    }

    #[tokio::test]
    async fn test_missing_flow_direction_is_missing_data() {
        let delineator = delineator(MemoryRasterSource::new());
        let err = delineator.delineate(DelineationRequest::new(38.9985, -76.9985)).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::MissingData);
    }

    #[tokio::test]
    async fn test_outside_extent_is_invalid_input() {
        let delineator = delineator(source());
        let err = delineator.delineate(DelineationRequest::new(10.0, 10.0)).await.unwrap_err();
        assert!(matches!(err, HydroError::OutOfBounds { .. }));
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_work() {
        let delineator = delineator(MemoryRasterSource::new());
        let request = DelineationRequest::new(0.0, 0.0).with_snapping(true, Some(5000));
        let err = delineator.delineate(request).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
    }

    #[tokio::test]
    async fn test_snap_radius_metadata() {
        let delineator = delineator(source());
        let at_centre = DelineationRequest::new(38.9985, -76.9985);

        let response = delineator.delineate(at_centre.clone()).await.unwrap();
        assert_eq!(response.metadata.snap_radius, None);

        // No accumulation layer: the point stays put but the radius is reported
        let response = delineator.delineate(at_centre.with_snapping(true, Some(250))).await.unwrap();
        assert_eq!(response.metadata.snap_radius, Some(250));
        let props = response.pour_point.properties.unwrap();
        assert_eq!(props["reason"], serde_json::json!("Flow accumulation file not found"));
    }

    #[tokio::test]
    async fn test_status_and_clear() {
        let cache: Arc<dyn ResultCache> = Arc::new(MemoryResultCache::new());
        let delineator = Delineator::new(Arc::new(source()), Some(cache));

        let status = delineator.status();
        assert!(!status.ready);
        assert!(status.cache_enabled);
        assert!(status.files.flow_direction.exists);
        assert!(!status.files.dem.exists);

        delineator
            .delineate(DelineationRequest::new(38.9985, -76.9985).with_snapping(false, None))
            .await
            .unwrap();
        assert_eq!(delineator.clear_cache().await.unwrap(), 1);
        assert_eq!(delineator.clear_cache().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_without_cache() {
        let delineator = delineator(source());
        assert!(!delineator.status().cache_enabled);
        assert_eq!(delineator.clear_cache().await.unwrap(), 0);
    }
}
