use std::collections::BTreeMap;

use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self { status: "healthy" }
    }
}

/// Service description served at the root path
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

impl Default for RootResponse {
    fn default() -> Self {
        Self {
            name: "Hydromap API",
            version: env!("CARGO_PKG_VERSION"),
            endpoints: BTreeMap::from([
                ("delineate", "/api/delineate"),
                ("delineate_status", "/api/delineate/status"),
                ("health", "/health"),
            ]),
        }
    }
}
