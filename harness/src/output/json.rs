//! JSON output
//!
//! Exports a collected telemetry buffer in JSON format for further analysis

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use tracing::info;
use wattprobe_shared::types::telemetry::TelemetryBuffer;

/// Write the whole telemetry buffer as pretty-printed JSON
pub fn generate_json(buffer: &TelemetryBuffer, output_path: &str) -> Result<()> {
    info!("Generating JSON output: {}", output_path);

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path))?;

    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, buffer)
        .context("Failed to serialize telemetry to JSON")?;

    info!("JSON output written to {} ({} readings)", output_path, buffer.len());

    Ok(())
}
