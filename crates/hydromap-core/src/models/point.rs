//! Pour points and the outcome of snapping them to a stream cell.

use geojson::{Feature, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Reason reported when the flow accumulation raster is missing
pub const REASON_NO_ACCUMULATION_FILE: &str = "Flow accumulation file not found";

/// Reason reported when the search window holds only nodata
pub const REASON_NO_VALID_DATA: &str = "No valid flow accumulation data in search radius";

/// A WGS84 longitude/latitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// What happened when the pour point was (or was not) moved onto a stream cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SnapOutcome {
    /// Snapping was not requested
    Disabled,
    /// Moved to the cell of highest flow accumulation in the search window
    Snapped {
        location: LonLat,
        distance_m: f64,
        accumulation: f64,
    },
    /// Snapping was requested but could not be performed
    Unsnapped { reason: String },
}

/// A requested outlet location together with its snapping outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PourPoint {
    pub original: LonLat,
    pub outcome: SnapOutcome,
}

impl PourPoint {
    pub fn unsnapped(original: LonLat, reason: impl Into<String>) -> Self {
        Self { original, outcome: SnapOutcome::Unsnapped { reason: reason.into() } }
    }

    pub fn without_snapping(original: LonLat) -> Self {
        Self { original, outcome: SnapOutcome::Disabled }
    }

    pub fn is_snapped(&self) -> bool {
        matches!(self.outcome, SnapOutcome::Snapped { .. })
    }

    /// Location the watershed is delineated from
    pub fn effective(&self) -> LonLat {
        match &self.outcome {
            SnapOutcome::Snapped { location, .. } => *location,
            _ => self.original,
        }
    }

    /// Cache key for this pour point: the effective location at six decimals, latitude first
    pub fn cache_key(&self) -> String {
        let at = self.effective();
        format!("{:.6},{:.6}", at.lat, at.lon)
    }

    /// GeoJSON point feature at the effective location
    pub fn to_feature(&self) -> Feature {
        let at = self.effective();

        let mut properties = JsonObject::new();
        properties.insert("snapped".to_string(), json!(self.is_snapped()));
        properties.insert("original_lat".to_string(), json!(self.original.lat));
        properties.insert("original_lon".to_string(), json!(self.original.lon));

        match &self.outcome {
            SnapOutcome::Snapped { distance_m, accumulation, .. } => {
                properties.insert("snap_distance_m".to_string(), json!(distance_m));
                properties.insert("flow_accumulation".to_string(), json!(accumulation));
            }
            SnapOutcome::Unsnapped { reason } => {
                properties.insert("reason".to_string(), json!(reason));
            }
            SnapOutcome::Disabled => {}
        }

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![at.lon, at.lat]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}
