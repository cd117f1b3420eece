//! Watershed masks and the statistics derived from them.

use serde::{Deserialize, Serialize};

use super::geometry::DistanceUnit;
use super::raster::CellIndex;

/// Binary grid marking the cells that drain to an outlet.
///
/// Has the shape of the flow direction raster it was traced on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatershedMask {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
    count: usize,
}

impl WatershedMask {
    /// An empty mask with every cell cleared
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols, cells: vec![false; rows * cols], count: 0 }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Mark a cell; returns false if it was already marked
    pub fn insert(&mut self, row: usize, col: usize) -> bool {
        let idx = row * self.cols + col;
        if self.cells[idx] {
            return false;
        }
        self.cells[idx] = true;
        self.count += 1;
        true
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[row * self.cols + col]
    }

    /// Number of marked cells
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Marked cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, marked)| **marked)
            .map(move |(i, _)| CellIndex::new(i / self.cols, i % self.cols))
    }

    /// Whether every marked cell of `self` is also marked in `other`
    pub fn is_subset_of(&self, other: &WatershedMask) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.cells.iter().zip(&other.cells).all(|(a, b)| !*a || *b)
    }

    /// Rows of 0/1 values, mostly useful for assertions and debugging
    pub fn to_grid(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.cols).map(|row| row.iter().map(|c| u8::from(*c)).collect()).collect()
    }
}

/// Elevation summary over the masked cells, or why it could not be computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElevationSummary {
    Computed {
        #[serde(rename = "elevation_min_m")]
        min: f64,
        #[serde(rename = "elevation_max_m")]
        max: f64,
        #[serde(rename = "elevation_mean_m")]
        mean: f64,
        /// Population standard deviation
        #[serde(rename = "elevation_std_m")]
        std: f64,
    },
    Unavailable {
        #[serde(rename = "elevation_unavailable")]
        reason: String,
    },
}

impl ElevationSummary {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ElevationSummary::Unavailable { reason: reason.into() }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, ElevationSummary::Computed { .. })
    }
}

/// Area, perimeter and elevation statistics for a delineated watershed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatershedStatistics {
    pub area_km2: f64,
    pub area_mi2: f64,
    pub area_m2: f64,
    pub perimeter_km: f64,
    pub perimeter_m: f64,
    pub num_cells: usize,
    #[serde(flatten)]
    pub elevation: ElevationSummary,
}

impl WatershedStatistics {
    /// Build from raw equal-area measurements, rounding like the published payload
    pub fn from_measurements(
        area_m2: f64,
        perimeter_m: f64,
        num_cells: usize,
        elevation: ElevationSummary,
    ) -> Self {
        Self {
            area_km2: round_to(DistanceUnit::Kilometers.area_from_square_meters(area_m2), 4),
            area_mi2: round_to(DistanceUnit::Miles.area_from_square_meters(area_m2), 4),
            area_m2: round_to(area_m2, 2),
            perimeter_km: round_to(DistanceUnit::Kilometers.from_meters(perimeter_m), 4),
            perimeter_m: round_to(perimeter_m, 2),
            num_cells,
            elevation,
        }
    }

    /// Statistics as a GeoJSON properties object
    pub fn to_properties(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
