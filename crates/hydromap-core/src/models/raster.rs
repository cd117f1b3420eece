//! In-memory raster grids and their affine georeferencing.

use num_traits::{NumCast, Zero};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::geometry::Crs;
use crate::error::{HydroError, Result};

/// Numeric cell types a raster can hold
pub trait RasterElement:
    Copy + PartialEq + PartialOrd + NumCast + Zero + Debug + Send + Sync + 'static
{
}

impl RasterElement for u8 {}
impl RasterElement for u16 {}
impl RasterElement for u32 {}
impl RasterElement for i16 {}
impl RasterElement for i32 {}
impl RasterElement for f32 {}
impl RasterElement for f64 {}

/// The three terrain derivatives the engine consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterLayer {
    /// Filled elevation model
    Dem,
    /// D8 flow direction codes
    FlowDirection,
    /// Upstream cell counts
    FlowAccumulation,
}

impl RasterLayer {
    pub const ALL: [RasterLayer; 3] =
        [RasterLayer::Dem, RasterLayer::FlowDirection, RasterLayer::FlowAccumulation];

    pub fn name(&self) -> &'static str {
        match self {
            RasterLayer::Dem => "dem",
            RasterLayer::FlowDirection => "flow_direction",
            RasterLayer::FlowAccumulation => "flow_accumulation",
        }
    }
}

impl std::fmt::Display for RasterLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A (row, col) position inside a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    pub row: usize,
    pub col: usize,
}

impl CellIndex {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Affine transformation between cell space (col, row) and map space (x, y).
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// North-up rasters have zero rotations and a negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::unit()
    }
}

impl GeoTransform {
    /// North-up transform without rotation
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Cell space equals map space: x = col, y = row
    pub fn unit() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// From GDAL order `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Map coordinates of a fractional cell position
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Map coordinates of the centre of a cell
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map coordinates of the grid corner at (row, col); corners run 0..=rows, 0..=cols
    pub fn corner(&self, row: usize, col: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    /// Cell containing a map coordinate, as signed indices (may lie outside the grid).
    ///
    /// Returns `None` for a degenerate transform.
    pub fn locate(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-15 {
            return None;
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        Some((row.floor() as i64, col.floor() as i64))
    }

    /// Absolute cell size as (x, y)
    pub fn resolution(&self) -> (f64, f64) {
        (self.pixel_width.abs(), self.pixel_height.abs())
    }
}

/// Shape and georeferencing of a raster without its cells
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Crs,
    pub nodata: Option<f64>,
}

impl RasterInfo {
    /// Cell containing a coordinate in this raster's CRS, as signed indices
    pub fn locate(&self, x: f64, y: f64) -> Result<(i64, i64)> {
        self.transform.locate(x, y).ok_or_else(|| {
            HydroError::InvalidRaster("degenerate affine transform".to_string())
        })
    }

    /// True for the nodata sentinel and for NaN
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata == Some(value)
    }
}

/// Immutable row-major grid of cells with georeferencing.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
    transform: GeoTransform,
    crs: Crs,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Build a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 || data.len() != rows * cols {
            return Err(HydroError::InvalidRaster(format!(
                "expected {}x{} = {} cells, got {}",
                rows,
                cols,
                rows * cols,
                data.len()
            )));
        }

        Ok(Self {
            rows,
            cols,
            data,
            transform: GeoTransform::default(),
            crs: Crs::wgs84(),
            nodata: None,
        })
    }

    /// Build a raster from nested rows (convenient for small fixtures)
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(HydroError::InvalidRaster("ragged rows".to_string()));
        }
        Self::from_vec(rows.into_iter().flatten().collect(), height, width)
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    pub fn with_nodata(mut self, nodata: T) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Whether signed indices fall inside the grid
    pub fn contains(&self, row: i64, col: i64) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// True for the nodata sentinel and for NaN
    pub fn is_nodata(&self, value: T) -> bool {
        if self.nodata == Some(value) {
            return true;
        }
        num_traits::cast::<T, f64>(value).map_or(true, f64::is_nan)
    }

    /// Cell containing a coordinate in this raster's CRS, as signed indices
    pub fn locate(&self, x: f64, y: f64) -> Result<(i64, i64)> {
        self.transform.locate(x, y).ok_or_else(|| {
            HydroError::InvalidRaster("degenerate affine transform".to_string())
        })
    }

    pub fn info(&self) -> RasterInfo {
        RasterInfo {
            rows: self.rows,
            cols: self.cols,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata.and_then(num_traits::cast::<T, f64>),
        }
    }

    /// Read the inclusive cell window `[row_min, row_max] x [col_min, col_max]`,
    /// clipped to the raster bounds. The window may be empty.
    pub fn window(&self, row_min: i64, row_max: i64, col_min: i64, col_max: i64) -> RasterWindow<T> {
        let r0 = row_min.max(0);
        let r1 = (row_max + 1).min(self.rows as i64);
        let c0 = col_min.max(0);
        let c1 = (col_max + 1).min(self.cols as i64);

        if r0 >= r1 || c0 >= c1 {
            return RasterWindow::empty();
        }

        let (r0, r1, c0, c1) = (r0 as usize, r1 as usize, c0 as usize, c1 as usize);
        let mut data = Vec::with_capacity((r1 - r0) * (c1 - c0));
        for row in r0..r1 {
            data.extend_from_slice(&self.data[row * self.cols + c0..row * self.cols + c1]);
        }

        RasterWindow { row_offset: r0, col_offset: c0, rows: r1 - r0, cols: c1 - c0, data }
    }

    /// Convert every cell to another element type (unrepresentable values become nodata)
    pub fn cast<U: RasterElement>(&self, fallback: U) -> Raster<U> {
        let nodata = self.nodata.and_then(num_traits::cast::<T, U>);
        let fill = nodata.unwrap_or(fallback);
        Raster {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| num_traits::cast::<T, U>(*v).unwrap_or(fill)).collect(),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata,
        }
    }
}

/// A clipped rectangular read from a raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterWindow<T> {
    /// Row of the window's first cell in the source raster
    pub row_offset: usize,
    /// Column of the window's first cell in the source raster
    pub col_offset: usize,
    pub rows: usize,
    pub cols: usize,
    data: Vec<T>,
}

impl<T: Copy> RasterWindow<T> {
    pub fn empty() -> Self {
        Self { row_offset: 0, col_offset: 0, rows: 0, cols: 0, data: Vec::new() }
    }

    /// Window over cells already read in row-major order
    pub fn from_parts(
        row_offset: usize,
        col_offset: usize,
        rows: usize,
        cols: usize,
        data: Vec<T>,
    ) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(HydroError::InvalidRaster(format!(
                "window of {}x{} cells holds {} values",
                rows,
                cols,
                data.len()
            )));
        }
        Ok(Self { row_offset, col_offset, rows, cols, data })
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }

    /// Iterate cells in row-major order with their source-raster indices
    pub fn cells(&self) -> impl Iterator<Item = (CellIndex, T)> + '_ {
        self.data.iter().enumerate().map(move |(i, v)| {
            let cell = CellIndex::new(self.row_offset + i / self.cols, self.col_offset + i % self.cols);
            (cell, *v)
        })
    }
}
