//! Status command implementation

use crate::output::{mark, OutputWriter};
use anyhow::Result;
use hydromap_core::config::HydroConfig;
use hydromap_core::models::{EngineStatus, FileStatus, RasterFiles, RasterLayer};

pub fn execute(config: &HydroConfig, output: &OutputWriter) -> Result<()> {
    let probe = |layer| FileStatus::probe(config.raster_path(layer));
    let status = EngineStatus::new(
        RasterFiles {
            dem: probe(RasterLayer::Dem),
            flow_direction: probe(RasterLayer::FlowDirection),
            flow_accumulation: probe(RasterLayer::FlowAccumulation),
        },
        config.cache_enabled.value,
    );

    if output.is_json() {
        return output.result(status);
    }

    output.section("Input Rasters");
    for (layer, file) in [
        (RasterLayer::Dem, &status.files.dem),
        (RasterLayer::FlowDirection, &status.files.flow_direction),
        (RasterLayer::FlowAccumulation, &status.files.flow_accumulation),
    ] {
        output.kv(layer, format!("{} {}", mark(file.exists), file.path.display()));
    }

    output.section("Engine");
    output.kv("Ready", mark(status.ready));
    if status.cache_enabled {
        output.kv(
            "Cache",
            format!("{} ({})", config.cache_backend.value, config.cache_dir.value.display()),
        );
    } else {
        output.kv("Cache", "disabled");
    }

    if !status.ready {
        output.info("Run the preprocessing scripts to produce the missing rasters");
    }
    Ok(())
}
