//! Config command implementation

use crate::output::OutputWriter;
use crate::output_types::ConfigEntry;
use anyhow::Result;
use hydromap_core::config::HydroConfig;

pub fn execute(config: &HydroConfig, output: &OutputWriter) -> Result<()> {
    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry { key, value, source })
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    if output.is_json() {
        return output.result(entries);
    }

    output.section("Configuration");
    for entry in &entries {
        output.kv(&entry.key, format!("{} ({:?})", entry.value, entry.source));
    }
    Ok(())
}
