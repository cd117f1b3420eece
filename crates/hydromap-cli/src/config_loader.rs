//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use hydromap_core::config::{CliConfigOverrides, HydroConfig};
use hydromap_core::ports::{FileRasterSource, RasterSource};
use hydromap_store::connect_result_cache;
use hydromap_watershed::Delineator;
use std::sync::Arc;

/// Load layered configuration with CLI overrides on top
pub fn load_config(overrides: CliConfigOverrides) -> Result<HydroConfig> {
    let mut config = HydroConfig::load().context("Failed to load configuration")?;
    config.update_from_cli(overrides);
    tracing::debug!(
        dem = %config.dem_path.value.display(),
        cache_enabled = config.cache_enabled.value,
        "Configuration loaded"
    );
    Ok(config)
}

/// Build a delineator over the configured rasters and cache backend
pub async fn build_delineator(config: &HydroConfig) -> Result<Delineator> {
    let rasters: Arc<dyn RasterSource> = Arc::new(FileRasterSource::from_config(config));
    let cache = connect_result_cache(config)
        .await
        .context("Failed to initialise result cache")?;
    Ok(Delineator::from_config(config, rasters, cache))
}
