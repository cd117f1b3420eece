//! Cache command implementation

use crate::cli::{CacheArgs, CacheCommand};
use crate::config_loader::build_delineator;
use crate::output::OutputWriter;
use crate::output_types::CacheClearOutput;
use anyhow::{Context, Result};
use hydromap_core::config::HydroConfig;

pub async fn execute(args: CacheArgs, config: &HydroConfig, output: &OutputWriter) -> Result<()> {
    match args.command {
        CacheCommand::Clear => clear(config, output).await,
    }
}

async fn clear(config: &HydroConfig, output: &OutputWriter) -> Result<()> {
    let delineator = build_delineator(config).await?;

    if !delineator.cache_enabled() {
        if output.is_json() {
            return output.result(CacheClearOutput { enabled: false, removed: 0 });
        }
        output.warning("Result cache is disabled; nothing to clear");
        return Ok(());
    }

    let removed = delineator.clear_cache().await.context("Failed to clear result cache")?;

    if output.is_json() {
        output.result(CacheClearOutput { enabled: true, removed })
    } else {
        output.success(format!("Removed {} cached watershed(s)", removed));
        Ok(())
    }
}
