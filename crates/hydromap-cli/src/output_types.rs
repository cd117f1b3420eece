use hydromap_core::config::ConfigSource;
use serde::Serialize;

/// One row of the config command
#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: ConfigSource,
}

/// Output for cache clear command
#[derive(Debug, Serialize)]
pub struct CacheClearOutput {
    pub enabled: bool,
    pub removed: usize,
}

/// Output for delineate command when the response is written to a file
#[derive(Debug, Serialize)]
pub struct DelineateFileOutput {
    pub path: String,
    pub num_cells: usize,
    pub area_km2: f64,
    pub from_cache: bool,
}
