//! Power table output
//!
//! CSV export of the time-sorted power table and a short text report of a
//! collection window.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::info;
use wattprobe_shared::types::table::PowerTable;
use wattprobe_shared::types::telemetry::TelemetryBuffer;

/// Write the power table as CSV, one row per reading
pub fn write_csv<W: Write>(table: &PowerTable, writer: &mut W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.column_names())?;

    for row in &table.rows {
        let mut cells = vec![
            row.time.to_rfc3339_opts(SecondsFormat::Millis, true),
            row.power.to_string(),
        ];
        cells.extend(
            row.rail_powers
                .iter()
                .map(|p| p.map(|w| format!("{:.6}", w)).unwrap_or_default()),
        );
        wtr.write_record(&cells)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Generate a CSV file from the power table
pub fn generate_csv(table: &PowerTable, output_path: &str) -> Result<()> {
    info!("Generating power table: {}", output_path);

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create table file: {}", output_path))?;
    let mut writer = BufWriter::new(file);

    write_csv(table, &mut writer)?;
    writer.flush()?;

    info!("Power table written to {} ({} rows)", output_path, table.len());
    Ok(())
}

/// Write a text report of a collection window with per-rail averages
pub fn generate_report<W: Write>(
    buffer: &TelemetryBuffer,
    table: &PowerTable,
    writer: &mut W,
) -> Result<()> {
    writeln!(writer, "Power Profile")?;
    writeln!(writer, "=============")?;
    writeln!(writer, "Settle Delay:   {:.3} s", buffer.settle_ns as f64 / 1e9)?;
    writeln!(writer, "Window:         {:.3} s", buffer.window_ns as f64 / 1e9)?;
    writeln!(writer, "Readings:       {}", buffer.len())?;
    writeln!(writer, "Failed Queries: {}", buffer.failed_queries)?;
    writeln!(writer, "Sample Rate:    {:.1} Hz", buffer.sample_rate_hz())?;

    let (Some(mean), Some(peak)) = (buffer.mean_power(), buffer.peak_power()) else {
        writeln!(writer, "\nNo telemetry readings collected.")?;
        return Ok(());
    };

    writeln!(writer, "\n{:<28} {:>12} {:>12} {:>8}", "Rail", "Mean(W)", "Peak(W)", "Samples")?;
    writeln!(writer, "{:-<63}", "")?;
    writeln!(writer, "{:<28} {:>12.3} {:>12.3} {:>8}", "Total", mean, peak, buffer.len())?;

    for (column, rail) in table.rails.iter().enumerate() {
        let values: Vec<f64> = table
            .rows
            .iter()
            .filter_map(|row| row.rail_powers.get(column).copied().flatten())
            .collect();
        if values.is_empty() {
            writeln!(writer, "{:<28} {:>12} {:>12} {:>8}", rail, "-", "-", 0)?;
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let peak = values.iter().copied().fold(f64::MIN, f64::max);
        writeln!(writer, "{:<28} {:>12.3} {:>12.3} {:>8}", rail, mean, peak, values.len())?;
    }

    Ok(())
}
