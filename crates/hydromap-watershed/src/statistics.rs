//! Area, perimeter and elevation statistics of a delineated watershed.

use geo::MultiPolygon;
use hydromap_core::error::Result;
use hydromap_core::models::{Crs, ElevationSummary, Raster, WatershedMask, WatershedStatistics};
use hydromap_geo::measure_equal_area;

/// Measure a watershed.
///
/// `polygons` are in `crs`. Area and perimeter come from the equal-area
/// projection and fail the request on error; elevation is best effort and
/// degrades to [`ElevationSummary::Unavailable`].
pub fn compute_statistics(
    mask: &WatershedMask,
    polygons: &MultiPolygon<f64>,
    crs: &Crs,
    elevation: Result<Raster<f64>>,
) -> Result<WatershedStatistics> {
    let measure = measure_equal_area(polygons, crs)?;

    let elevation = match elevation {
        Ok(dem) => summarize_elevation(mask, &dem),
        Err(e) => {
            tracing::warn!(error = %e, "Elevation statistics unavailable");
            ElevationSummary::unavailable(e.to_string())
        }
    };

    Ok(WatershedStatistics::from_measurements(
        measure.area_m2,
        measure.perimeter_m,
        mask.count(),
        elevation,
    ))
}

/// Min, max, mean and population standard deviation over masked valid cells
pub fn summarize_elevation(mask: &WatershedMask, dem: &Raster<f64>) -> ElevationSummary {
    if dem.rows() != mask.rows() || dem.cols() != mask.cols() {
        tracing::warn!(
            dem_rows = dem.rows(),
            dem_cols = dem.cols(),
            mask_rows = mask.rows(),
            mask_cols = mask.cols(),
            "Elevation raster does not match the flow direction grid"
        );
        return ElevationSummary::unavailable(format!(
            "Elevation raster is {}x{}, flow direction grid is {}x{}",
            dem.rows(),
            dem.cols(),
            mask.rows(),
            mask.cols()
        ));
    }

    let values: Vec<f64> = mask
        .cells()
        .filter_map(|cell| dem.get(cell.row, cell.col))
        .filter(|v| !dem.is_nodata(*v))
        .collect();

    if values.is_empty() {
        tracing::warn!(cells = mask.count(), "No valid elevation inside watershed");
        return ElevationSummary::unavailable("No valid elevation data in watershed");
    }

    let n = values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    ElevationSummary::Computed { min, max, mean, std: variance.sqrt() }
}
