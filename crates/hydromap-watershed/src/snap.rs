//! Pour-point snapping to the cell of highest flow accumulation.

use hydromap_core::error::{HydroError, Result};
use hydromap_core::models::{
    LonLat, PourPoint, Raster, RasterInfo, RasterLayer, RasterWindow, SnapOutcome,
    REASON_NO_ACCUMULATION_FILE, REASON_NO_VALID_DATA,
};
use hydromap_core::ports::RasterSource;
use hydromap_geo::{haversine_distance, meters_per_degree, to_geographic, to_raster_crs};

/// Move a point onto the strongest flow line within `radius_m` meters.
///
/// Only the search window of the accumulation raster is read. A missing
/// flow accumulation raster is not an error; the point is returned unsnapped
/// with a reason. Read and projection failures propagate.
pub fn snap_pour_point(source: &dyn RasterSource, point: LonLat, radius_m: u32) -> Result<PourPoint> {
    if !source.exists(RasterLayer::FlowAccumulation) {
        tracing::warn!(
            path = %source.location(RasterLayer::FlowAccumulation).display(),
            "Flow accumulation raster missing, skipping snap"
        );
        return Ok(PourPoint::unsnapped(point, REASON_NO_ACCUMULATION_FILE));
    }

    let result = source.describe(RasterLayer::FlowAccumulation).and_then(|info| {
        let search = SearchWindow::around(&info, point, radius_m)?;
        let window = source.read_window(
            RasterLayer::FlowAccumulation,
            search.row - search.radius,
            search.row + search.radius,
            search.col - search.radius,
            search.col + search.radius,
        )?;
        pick_maximum(&info, &search, &window, point)
    });

    match result {
        Err(HydroError::RasterNotFound { .. }) => {
            Ok(PourPoint::unsnapped(point, REASON_NO_ACCUMULATION_FILE))
        }
        other => other,
    }
}

/// Snap against an already opened accumulation raster
pub fn snap_to_accumulation(accumulation: &Raster<f64>, point: LonLat, radius_m: u32) -> Result<PourPoint> {
    let info = accumulation.info();
    let search = SearchWindow::around(&info, point, radius_m)?;
    let window = accumulation.window(
        search.row - search.radius,
        search.row + search.radius,
        search.col - search.radius,
        search.col + search.radius,
    );
    pick_maximum(&info, &search, &window, point)
}

/// Cell under the point and the search radius in cells
struct SearchWindow {
    row: i64,
    col: i64,
    radius: i64,
}

impl SearchWindow {
    fn around(info: &RasterInfo, point: LonLat, radius_m: u32) -> Result<Self> {
        let (x, y) = to_raster_crs(point.lon, point.lat, &info.crs)?;
        let (row, col) = info.locate(x, y)?;
        let radius = search_radius_pixels(radius_m, info, point.lat);
        Ok(Self { row, col, radius })
    }
}

fn pick_maximum(
    info: &RasterInfo,
    search: &SearchWindow,
    window: &RasterWindow<f64>,
    point: LonLat,
) -> Result<PourPoint> {
    let mut best = None;
    for (cell, value) in window.cells() {
        if info.is_nodata(value) {
            continue;
        }
        // Strict comparison keeps the first maximum in row-major order
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((cell, value)),
        }
    }

    let Some((cell, value)) = best else {
        tracing::debug!(row = search.row, col = search.col, radius = search.radius, "No valid accumulation in search window");
        return Ok(PourPoint::unsnapped(point, REASON_NO_VALID_DATA));
    };

    let (cx, cy) = info.transform.cell_center(cell.row, cell.col);
    let (lon, lat) = to_geographic(cx, cy, &info.crs)?;
    let location = LonLat::new(lon, lat);
    let distance_m = haversine_distance(point, location);

    tracing::debug!(
        from_row = search.row,
        from_col = search.col,
        to_row = cell.row,
        to_col = cell.col,
        distance_m,
        accumulation = value,
        "Snapped pour point"
    );

    Ok(PourPoint {
        original: point,
        outcome: SnapOutcome::Snapped { location, distance_m, accumulation: value },
    })
}

/// Search radius in cells; at least one.
///
/// Geographic rasters have degree-sized cells, so the radius is converted
/// with the meters-per-degree length at the point's latitude.
fn search_radius_pixels(radius_m: u32, info: &RasterInfo, lat: f64) -> i64 {
    let (res_x, res_y) = info.transform.resolution();
    let cell_size = res_x.min(res_y);

    let radius_units = if info.crs.is_geographic() {
        radius_m as f64 / meters_per_degree(lat)
    } else {
        radius_m as f64
    };

    let pixels = (radius_units / cell_size).floor();
    let limit = info.rows.max(info.cols) as f64;
    if !pixels.is_finite() || pixels > limit {
        return limit as i64;
    }
    (pixels as i64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydromap_core::models::{Crs, GeoTransform};
    use hydromap_core::ports::MemoryRasterSource;

    /// 5x5 geographic grid of 0.001 degree cells with its corner at (10.0, 1.0)
    fn accumulation(values: Vec<Vec<f64>>) -> Raster<f64> {
        Raster::from_rows(values)
            .unwrap()
            .with_transform(GeoTransform::new(10.0, 1.0, 0.001, -0.001))
            .with_nodata(-1.0)
    }

    fn center_of(row: usize, col: usize) -> LonLat {
        LonLat::new(10.0 + (col as f64 + 0.5) * 0.001, 1.0 - (row as f64 + 0.5) * 0.001)
    }

    #[test]
    fn test_snap_to_single_interior_maximum() {
        let mut grid = vec![vec![1.0; 5]; 5];
        grid[1][3] = 500.0;
        let raster = accumulation(grid);

        // ~111 m per 0.001 degree, so 250 m covers two cells in every direction
        let point = center_of(2, 2);
        let snapped = snap_to_accumulation(&raster, point, 250).unwrap();

        match snapped.outcome {
            SnapOutcome::Snapped { location, distance_m, accumulation } => {
                let expected = center_of(1, 3);
                assert!((location.lon - expected.lon).abs() < 1e-9);
                assert!((location.lat - expected.lat).abs() < 1e-9);
                assert_eq!(accumulation, 500.0);
                assert!((distance_m - haversine_distance(point, expected)).abs() < 1e-6);
            }
            other => panic!("expected a snap, got {:?}", other),
        }
        assert_eq!(snapped.original, point);
    }

    #[test]
    fn test_snap_all_nodata_window() {
        let raster = accumulation(vec![vec![-1.0; 5]; 5]);
        let point = center_of(2, 2);
        let snapped = snap_to_accumulation(&raster, point, 100).unwrap();

        assert_eq!(snapped, PourPoint::unsnapped(point, REASON_NO_VALID_DATA));
    }

    #[test]
    fn test_snap_ignores_nan() {
        let mut grid = vec![vec![f64::NAN; 5]; 5];
        grid[2][1] = 3.0;
        let snapped = snap_to_accumulation(&accumulation(grid), center_of(2, 2), 120).unwrap();
        assert!(snapped.is_snapped());
        assert_eq!(snapped.effective().lon, center_of(2, 1).lon);
    }

    #[test]
    fn test_ties_take_first_in_row_major_order() {
        let mut grid = vec![vec![0.0; 5]; 5];
        grid[3][1] = 9.0;
        grid[1][3] = 9.0;
        let snapped = snap_to_accumulation(&accumulation(grid), center_of(2, 2), 250).unwrap();
        let at = snapped.effective();
        assert!((at.lat - center_of(1, 3).lat).abs() < 1e-9);
        assert!((at.lon - center_of(1, 3).lon).abs() < 1e-9);
    }

    #[test]
    fn test_zero_radius_still_searches_neighbours() {
        let mut grid = vec![vec![0.0; 5]; 5];
        grid[2][3] = 7.0;
        let snapped = snap_to_accumulation(&accumulation(grid), center_of(2, 2), 0).unwrap();
        assert!(snapped.is_snapped());
    }

    #[test]
    fn test_point_outside_raster_is_unsnapped() {
        let raster = accumulation(vec![vec![5.0; 5]; 5]);
        let snapped = snap_to_accumulation(&raster, LonLat::new(50.0, 50.0), 100).unwrap();
        assert!(!snapped.is_snapped());
    }

    #[test]
    fn test_missing_accumulation_raster() {
        let source = MemoryRasterSource::new();
        let point = LonLat::new(1.0, 2.0);
        let snapped = snap_pour_point(&source, point, 100).unwrap();
        assert_eq!(snapped, PourPoint::unsnapped(point, REASON_NO_ACCUMULATION_FILE));
    }

    #[test]
    fn test_projected_radius_uses_cell_size() {
        let raster = Raster::from_vec(vec![0.0; 100], 10, 10)
            .unwrap()
            .with_transform(GeoTransform::new(500_000.0, 4_000_000.0, 30.0, -30.0))
            .with_crs(Crs::from_epsg(32618));
        let info = raster.info();
        assert_eq!(search_radius_pixels(100, &info, 0.0), 3);
        assert_eq!(search_radius_pixels(10, &info, 0.0), 1);
        assert_eq!(search_radius_pixels(1000, &info, 0.0), 10);
    }

    /// 400x400 grid of 1/3 arc-second cells in NAD83 whose largest value sits in the far corner
    fn nad83_accumulation() -> Raster<f64> {
        let mut grid = vec![vec![1.0; 400]; 400];
        grid[201][201] = 50.0;
        grid[399][399] = 1_000_000.0;
        Raster::from_rows(grid)
            .unwrap()
            .with_transform(GeoTransform::new(-77.0, 39.02, NAD83_CELL, -NAD83_CELL))
            .with_crs(Crs::from_epsg(4269))
    }

    const NAD83_CELL: f64 = 1.0 / 10_800.0;

    fn nad83_center(row: usize, col: usize) -> LonLat {
        LonLat::new(-77.0 + (col as f64 + 0.5) * NAD83_CELL, 39.02 - (row as f64 + 0.5) * NAD83_CELL)
    }

    #[test]
    fn test_nad83_radius_in_degrees() {
        let raster = nad83_accumulation();
        assert!(raster.crs().is_geographic());
        // 20 m is ~2.5 cells of ~7.2 m longitude at this latitude
        assert_eq!(search_radius_pixels(20, &raster.info(), 39.0), 2);
    }

    #[test]
    fn test_nad83_snap_stays_local() {
        let raster = nad83_accumulation();
        let point = nad83_center(200, 200);
        let snapped = snap_to_accumulation(&raster, point, 20).unwrap();

        match snapped.outcome {
            SnapOutcome::Snapped { distance_m, accumulation, .. } => {
                assert_eq!(accumulation, 50.0);
                assert!(distance_m < 40.0, "snapped {} m away", distance_m);
            }
            other => panic!("expected a snap, got {:?}", other),
        }
    }

    #[test]
    fn test_source_window_matches_in_memory_snap() {
        use hydromap_core::formats::write_geotiff;
        use hydromap_core::ports::FileRasterSource;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("acc.tif");
        let mut grid = vec![vec![1.0; 5]; 5];
        grid[1][3] = 500.0;
        grid[4][0] = 900.0;
        let raster = accumulation(grid);
        write_geotiff(&raster, &path).unwrap();

        let source = FileRasterSource::new(dir.path().join("dem.tif"), dir.path().join("fdir.tif"), &path);
        let point = center_of(2, 2);
        for radius in [0, 120, 250] {
            let windowed = snap_pour_point(&source, point, radius).unwrap();
            let in_memory = snap_to_accumulation(&raster, point, radius).unwrap();
            assert_eq!(windowed, in_memory, "radius {}", radius);
        }
    }
}
