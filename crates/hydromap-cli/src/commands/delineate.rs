//! Delineate command implementation

use crate::cli::DelineateArgs;
use crate::config_loader::build_delineator;
use crate::output::{mark, OutputWriter};
use crate::output_types::DelineateFileOutput;
use anyhow::{Context, Result};
use hydromap_core::config::HydroConfig;
use hydromap_core::models::{DelineationRequest, ElevationSummary};

pub async fn execute(args: DelineateArgs, config: &HydroConfig, output: &OutputWriter) -> Result<()> {
    let delineator = build_delineator(config).await?;

    let mut request = DelineationRequest::new(args.lat, args.lon);
    if args.no_snap {
        request = request.with_snapping(false, None);
    } else if args.snap_radius.is_some() {
        request = request.with_snapping(true, args.snap_radius);
    }

    let response = delineator
        .delineate(request)
        .await
        .with_context(|| format!("Delineation at ({}, {}) failed", args.lat, args.lon))?;

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&response)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let summary = DelineateFileOutput {
            path: path.display().to_string(),
            num_cells: response.statistics.num_cells,
            area_km2: response.statistics.area_km2,
            from_cache: response.metadata.from_cache,
        };
        if output.is_json() {
            return output.result(summary);
        }
        output.success(format!(
            "Wrote watershed of {} cells ({} km²) to {}",
            summary.num_cells, summary.area_km2, summary.path
        ));
        return Ok(());
    }

    if output.is_json() {
        return output.result(&response);
    }

    let stats = &response.statistics;
    output.section("Watershed");
    output.kv("Area", format!("{} km² ({} mi²)", stats.area_km2, stats.area_mi2));
    output.kv("Perimeter", format!("{} km", stats.perimeter_km));
    output.kv("Cells", stats.num_cells);
    match &stats.elevation {
        ElevationSummary::Computed { min, max, mean, std } => {
            output.kv("Elevation", format!("{:.1} to {:.1} m (mean {:.1}, std {:.1})", min, max, mean, std));
        }
        ElevationSummary::Unavailable { reason } => output.kv("Elevation", format!("unavailable: {}", reason)),
    }

    output.section("Pour Point");
    output.kv("Requested", format!("{}, {}", args.lat, args.lon));
    let props = response.pour_point.properties.clone().unwrap_or_default();
    if props.get("snapped").and_then(|v| v.as_bool()).unwrap_or(false) {
        output.kv("Snapped", mark(true));
        if let Some(distance) = props.get("snap_distance_m").and_then(|v| v.as_f64()) {
            output.kv("Snap distance", format!("{:.1} m", distance));
        }
        if let Some(accumulation) = props.get("flow_accumulation") {
            output.kv("Flow accumulation", accumulation);
        }
    } else if let Some(reason) = props.get("reason").and_then(|v| v.as_str()) {
        output.kv("Snapped", format!("{} {}", mark(false), reason));
    } else {
        output.kv("Snapped", "disabled");
    }

    output.section("Run");
    output.kv("Processing time", format!("{:.3} s", response.metadata.processing_time));
    output.kv("From cache", response.metadata.from_cache);
    Ok(())
}
