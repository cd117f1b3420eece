//! Access to the terrain rasters a delineation reads.
//!
//! [`RasterSource`] hides where the DEM, flow direction and flow accumulation
//! layers live. Snapping only needs a neighbourhood of the accumulation grid,
//! so sources can serve windows without decoding the whole layer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::HydroConfig;
use crate::error::{HydroError, Result};
use crate::formats::geotiff::{read_geotiff, read_geotiff_info, read_geotiff_window};
use crate::models::raster::{Raster, RasterInfo, RasterLayer, RasterWindow};

/// Read-only access to the three terrain rasters.
///
/// Every call opens the raster afresh; nothing is shared between callers.
/// Implementations are blocking and should be driven from a blocking pool.
pub trait RasterSource: Send + Sync {
    /// Where the layer lives, for status reports and error messages
    fn location(&self, layer: RasterLayer) -> PathBuf;

    /// Whether the layer is available
    fn exists(&self, layer: RasterLayer) -> bool;

    /// Open a layer as floating-point cells
    fn open(&self, layer: RasterLayer) -> Result<Raster<f64>>;

    /// Open the flow direction layer as integer D8 codes
    fn open_flow_direction(&self) -> Result<Raster<i32>> {
        Ok(self.open(RasterLayer::FlowDirection)?.cast(0))
    }

    /// Shape, georeferencing and nodata of a layer
    fn describe(&self, layer: RasterLayer) -> Result<RasterInfo> {
        Ok(self.open(layer)?.info())
    }

    /// Cells of the inclusive window `[row_min, row_max] x [col_min, col_max]`,
    /// clipped to the layer bounds
    fn read_window(
        &self,
        layer: RasterLayer,
        row_min: i64,
        row_max: i64,
        col_min: i64,
        col_max: i64,
    ) -> Result<RasterWindow<f64>> {
        Ok(self.open(layer)?.window(row_min, row_max, col_min, col_max))
    }
}

/// GeoTIFF files on the local filesystem
#[derive(Debug, Clone)]
pub struct FileRasterSource {
    dem: PathBuf,
    flow_direction: PathBuf,
    flow_accumulation: PathBuf,
}

impl FileRasterSource {
    pub fn new(
        dem: impl Into<PathBuf>,
        flow_direction: impl Into<PathBuf>,
        flow_accumulation: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dem: dem.into(),
            flow_direction: flow_direction.into(),
            flow_accumulation: flow_accumulation.into(),
        }
    }

    pub fn from_config(config: &HydroConfig) -> Self {
        Self::new(
            config.raster_path(RasterLayer::Dem),
            config.raster_path(RasterLayer::FlowDirection),
            config.raster_path(RasterLayer::FlowAccumulation),
        )
    }

    fn path(&self, layer: RasterLayer) -> &Path {
        match layer {
            RasterLayer::Dem => &self.dem,
            RasterLayer::FlowDirection => &self.flow_direction,
            RasterLayer::FlowAccumulation => &self.flow_accumulation,
        }
    }

    fn checked_path(&self, layer: RasterLayer) -> Result<&Path> {
        let path = self.path(layer);
        if !path.exists() {
            return Err(HydroError::RasterNotFound {
                name: layer.name().to_string(),
                path: path.to_path_buf(),
            });
        }
        Ok(path)
    }
}

impl RasterSource for FileRasterSource {
    fn location(&self, layer: RasterLayer) -> PathBuf {
        self.path(layer).to_path_buf()
    }

    fn exists(&self, layer: RasterLayer) -> bool {
        self.path(layer).exists()
    }

    fn open(&self, layer: RasterLayer) -> Result<Raster<f64>> {
        let path = self.checked_path(layer)?;
        tracing::debug!(layer = %layer, path = %path.display(), "Opening raster");
        read_geotiff(path)
    }

    fn open_flow_direction(&self) -> Result<Raster<i32>> {
        let path = self.checked_path(RasterLayer::FlowDirection)?;
        tracing::debug!(path = %path.display(), "Opening flow direction raster");
        read_geotiff(path)
    }

    fn describe(&self, layer: RasterLayer) -> Result<RasterInfo> {
        read_geotiff_info(self.checked_path(layer)?)
    }

    fn read_window(
        &self,
        layer: RasterLayer,
        row_min: i64,
        row_max: i64,
        col_min: i64,
        col_max: i64,
    ) -> Result<RasterWindow<f64>> {
        let path = self.checked_path(layer)?;
        tracing::debug!(layer = %layer, row_min, row_max, col_min, col_max, "Reading raster window");
        read_geotiff_window(path, row_min, row_max, col_min, col_max)
    }
}

/// Rasters held in memory; useful for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryRasterSource {
    layers: HashMap<RasterLayer, Raster<f64>>,
}

impl MemoryRasterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, layer: RasterLayer, raster: Raster<f64>) -> Self {
        self.layers.insert(layer, raster);
        self
    }
}

impl RasterSource for MemoryRasterSource {
    fn location(&self, layer: RasterLayer) -> PathBuf {
        PathBuf::from(format!("memory://{}", layer.name()))
    }

    fn exists(&self, layer: RasterLayer) -> bool {
        self.layers.contains_key(&layer)
    }

    fn open(&self, layer: RasterLayer) -> Result<Raster<f64>> {
        self.layers.get(&layer).cloned().ok_or_else(|| HydroError::RasterNotFound {
            name: layer.name().to_string(),
            path: self.location(layer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::formats::geotiff::write_geotiff;
    use tempfile::TempDir;

    #[test]
    fn test_memory_source_missing_layer() {
        let source = MemoryRasterSource::new()
            .with_layer(RasterLayer::Dem, Raster::from_vec(vec![1.0; 4], 2, 2).unwrap());

        assert!(source.exists(RasterLayer::Dem));
        assert!(!source.exists(RasterLayer::FlowDirection));

        let err = source.open_flow_direction().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::MissingData);
        assert_eq!(source.location(RasterLayer::Dem), PathBuf::from("memory://dem"));
    }

    #[test]
    fn test_memory_source_casts_flow_direction() {
        let fdir = Raster::from_vec(vec![0.0, 1.0, 64.0, 128.0], 2, 2).unwrap().with_nodata(0.0);
        let source = MemoryRasterSource::new().with_layer(RasterLayer::FlowDirection, fdir);

        let codes = source.open_flow_direction().unwrap();
        assert_eq!(codes.data(), &[0, 1, 64, 128]);
        assert_eq!(codes.nodata(), Some(0));
    }

    #[test]
    fn test_file_source_reads_geotiff() {
        let dir = TempDir::new().unwrap();
        let acc = dir.path().join("acc.tif");
        write_geotiff(&Raster::from_vec(vec![1.0f32, 9.0, 3.0, 2.0], 2, 2).unwrap(), &acc).unwrap();

        let source = FileRasterSource::new(dir.path().join("dem.tif"), dir.path().join("fdir.tif"), &acc);
        assert!(source.exists(RasterLayer::FlowAccumulation));
        assert!(!source.exists(RasterLayer::Dem));

        let raster = source.open(RasterLayer::FlowAccumulation).unwrap();
        assert_eq!(raster.data(), &[1.0, 9.0, 3.0, 2.0]);

        let err = source.open(RasterLayer::Dem).unwrap_err();
        assert!(matches!(err, HydroError::RasterNotFound { .. }));
    }

    #[test]
    fn test_file_source_nan_flow_direction() {
        let dir = TempDir::new().unwrap();
        let fdir = dir.path().join("fdir.tif");
        let raster = Raster::from_vec(vec![f64::NAN, 1.0, 64.0, f64::NAN], 2, 2).unwrap().with_nodata(f64::NAN);
        write_geotiff(&raster, &fdir).unwrap();

        let source = FileRasterSource::new(dir.path().join("dem.tif"), &fdir, dir.path().join("acc.tif"));
        let codes = source.open_flow_direction().unwrap();
        assert_eq!(codes.data(), &[0, 1, 64, 0]);
        assert_eq!(codes.nodata(), Some(0));
    }

    #[test]
    fn test_file_source_window_and_describe() {
        let dir = TempDir::new().unwrap();
        let acc = dir.path().join("acc.tif");
        let raster = Raster::from_vec((0..16).map(|v| v as f32).collect(), 4, 4).unwrap().with_nodata(-1.0);
        write_geotiff(&raster, &acc).unwrap();

        let source = FileRasterSource::new(dir.path().join("dem.tif"), dir.path().join("fdir.tif"), &acc);
        let info = source.describe(RasterLayer::FlowAccumulation).unwrap();
        assert_eq!((info.rows, info.cols, info.nodata), (4, 4, Some(-1.0)));

        let window = source.read_window(RasterLayer::FlowAccumulation, 1, 2, 2, 9).unwrap();
        assert_eq!((window.row_offset, window.col_offset, window.rows, window.cols), (1, 2, 2, 2));
        assert_eq!(window.values(), &[6.0, 7.0, 10.0, 11.0]);

        let memory = MemoryRasterSource::new().with_layer(RasterLayer::FlowAccumulation, raster.cast(-1.0));
        assert_eq!(
            memory.read_window(RasterLayer::FlowAccumulation, 1, 2, 2, 9).unwrap(),
            window
        );

        let err = source.describe(RasterLayer::Dem).unwrap_err();
        assert!(matches!(err, HydroError::RasterNotFound { .. }));
    }
}
