use hydromap_core::models::DelineationRequest;
use serde::Deserialize;

/// Delineation request body
#[derive(Debug, Clone, Deserialize)]
pub struct DelineateRequest {
    pub lat: f64,
    pub lon: f64,
    /// Defaults to the server setting
    #[serde(default)]
    pub snap_to_stream: Option<bool>,
    /// Meters; defaults to the server setting
    #[serde(default)]
    pub snap_radius: Option<i64>,
}

impl From<DelineateRequest> for DelineationRequest {
    fn from(body: DelineateRequest) -> Self {
        DelineationRequest {
            lat: body.lat,
            lon: body.lon,
            snap_to_stream: body.snap_to_stream,
            snap_radius: body.snap_radius,
        }
    }
}
