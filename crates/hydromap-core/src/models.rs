pub mod geometry;
pub mod point;
pub mod raster;
pub mod response;
pub mod watershed;

pub use geometry::{Crs, DistanceUnit, EQUAL_AREA_EPSG};
pub use point::{LonLat, PourPoint, SnapOutcome, REASON_NO_ACCUMULATION_FILE, REASON_NO_VALID_DATA};
pub use raster::{
    CellIndex, GeoTransform, Raster, RasterElement, RasterInfo, RasterLayer, RasterWindow,
};
pub use response::{
    validate_snap_radius, DelineationRequest, DelineationResponse, EngineStatus, FileStatus,
    RasterFiles, ResponseMetadata, MAX_SNAP_RADIUS,
};
pub use watershed::{ElevationSummary, WatershedMask, WatershedStatistics};
