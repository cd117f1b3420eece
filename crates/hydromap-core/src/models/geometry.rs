//! Spatial reference and unit types shared across the hydromap crates.

use serde::{Deserialize, Serialize};

/// EPSG code of the equal-area projection used for watershed measurements
pub const EQUAL_AREA_EPSG: u32 = 6933;

/// Geographic (longitude/latitude in degrees) EPSG codes recognised without PROJ
const GEOGRAPHIC_EPSG: &[u32] = &[
    4326, // WGS 84
    4269, // NAD83
    4267, // NAD27
    4152, // NAD83(HARN)
    4759, // NAD83(NSRS2007)
    6318, // NAD83(2011)
    4617, // NAD83(CSRS)
    4258, // ETRS89
    4230, // ED50
    4283, // GDA94
    7844, // GDA2020
    4674, // SIRGAS 2000
    4490, // CGCS2000
    4612, // JGD2000
    6668, // JGD2011
    4322, // WGS 72
    4277, // OSGB36
    4148, // Hartebeesthoek94
    4167, // NZGD2000
];

/// Coordinate Reference System identified by EPSG code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: u32,
    pub name: String,
    /// Coordinates are longitude/latitude degrees rather than projected units
    #[serde(default)]
    pub geographic: bool,
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Crs {
    pub fn new(epsg: u32, name: impl Into<String>) -> Self {
        Self { epsg, name: name.into(), geographic: GEOGRAPHIC_EPSG.contains(&epsg) }
    }

    /// A CRS known to be geographic, e.g. from a GeoTIFF's geographic type key
    pub fn geographic(epsg: u32) -> Self {
        Self { geographic: true, ..Self::from_epsg(epsg) }
    }

    /// CRS from a bare EPSG code
    pub fn from_epsg(epsg: u32) -> Self {
        match epsg {
            4326 => Self::wgs84(),
            3857 => Self::web_mercator(),
            EQUAL_AREA_EPSG => Self::equal_area(),
            code => Self::new(code, format!("EPSG:{}", code)),
        }
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::new(4326, "WGS 84")
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::new(3857, "Web Mercator")
    }

    /// WGS 84 / NSIDC EASE-Grid 2.0 Global (EPSG:6933), an equal-area projection
    pub fn equal_area() -> Self {
        Self::new(EQUAL_AREA_EPSG, "WGS 84 / NSIDC EASE-Grid 2.0 Global")
    }

    /// Whether coordinates in this CRS are WGS84 longitude/latitude degrees
    pub fn is_wgs84(&self) -> bool {
        self.epsg == 4326
    }

    /// Whether coordinates are longitude/latitude degrees (WGS84, NAD83, ETRS89, ...)
    pub fn is_geographic(&self) -> bool {
        self.geographic
    }

    /// Authority string understood by PROJ, e.g. `EPSG:4326`
    pub fn authority(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{} ({})", self.epsg, self.name)
    }
}

/// Distance and area units reported in watershed statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceUnit {
    #[default]
    Meters,
    Kilometers,
    Miles,
}

impl DistanceUnit {
    /// Convert a length in meters to this unit
    pub fn from_meters(&self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Meters => meters,
            DistanceUnit::Kilometers => meters / 1000.0,
            DistanceUnit::Miles => meters / 1609.34,
        }
    }

    /// Convert an area in square meters to square units of this unit
    pub fn area_from_square_meters(&self, square_meters: f64) -> f64 {
        match self {
            DistanceUnit::Meters => square_meters,
            DistanceUnit::Kilometers => square_meters / 1_000_000.0,
            DistanceUnit::Miles => square_meters / 2_589_988.0,
        }
    }
}
