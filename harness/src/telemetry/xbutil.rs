//! Accelerator board telemetry via `xbutil examine --r electrical`
//!
//! The report has a fixed line layout:
//!
//! | line | content |
//! |------|---------|
//! | 5    | `Max Power : <int> Watts` |
//! | 6    | `Power : <float> Watts` |
//! | 7    | `Power Warning : <text>` |
//! | > 10 | one rail per non-blank line: `<name> : <voltage> V  <current> A` |
//!
//! The current column is optional.

use crate::telemetry::{run_command, TelemetryError, TelemetrySource};
use std::collections::BTreeMap;
use wattprobe_shared::types::telemetry::{PowerReport, RailMetric};

const MAX_POWER_LINE: usize = 5;
const POWER_LINE: usize = 6;
const WARNING_LINE: usize = 7;
const LAST_HEADER_LINE: usize = 10;

/// Telemetry source backed by the board management tool
#[derive(Debug, Clone)]
pub struct XbutilSource {
    device_id: String,
    program: String,
}

impl XbutilSource {
    /// Source for the board at PCI address `device_id` (e.g. `0000:bf:00.1`)
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            program: "xbutil".to_string(),
        }
    }

    /// Use a different executable in place of `xbutil`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Board address
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl TelemetrySource for XbutilSource {
    fn name(&self) -> &str {
        "xbutil"
    }

    fn query(&mut self) -> Result<PowerReport, TelemetryError> {
        let stdout = run_command(
            &self.program,
            &["examine", "-d", &self.device_id, "--r", "electrical"],
        )?;
        parse_power_report(&stdout)
    }
}

/// Text after the first ':' on a line, trimmed. Later colons belong to the
/// value, so warning text such as `critical: 12V rail` survives intact.
fn field_value(line: &str, index: usize) -> Result<&str, TelemetryError> {
    line.split_once(':')
        .map(|(_, value)| value.trim())
        .ok_or_else(|| TelemetryError::malformed(index, format!("missing ':' in '{}'", line.trim())))
}

/// First whitespace-separated token of `value`, parsed
fn first_number<T: std::str::FromStr>(value: &str, index: usize) -> Result<T, TelemetryError> {
    let token = value
        .split_whitespace()
        .next()
        .ok_or_else(|| TelemetryError::malformed(index, "empty value"))?;
    token
        .parse()
        .map_err(|_| TelemetryError::malformed(index, format!("'{}' is not a number", token)))
}

fn line_at<'a>(lines: &[&'a str], index: usize) -> Result<&'a str, TelemetryError> {
    lines
        .get(index)
        .copied()
        .ok_or_else(|| TelemetryError::malformed(index, format!("report has only {} lines", lines.len())))
}

/// Parse a rail line: `<name> : <voltage> <unit>  <current> <unit>`
fn parse_rail(line: &str, index: usize) -> Result<(String, RailMetric), TelemetryError> {
    let (name, values) = line
        .split_once(':')
        .ok_or_else(|| TelemetryError::malformed(index, format!("missing ':' in rail '{}'", line.trim())))?;

    // Columns are separated by runs of two or more spaces
    let mut columns = values
        .trim()
        .split("  ")
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let voltage_column = columns
        .next()
        .ok_or_else(|| TelemetryError::malformed(index, "rail has no voltage"))?;
    let voltage: f64 = first_number(voltage_column, index)?;
    let current = match columns.next() {
        Some(column) => Some(first_number::<f64>(column, index)?),
        None => None,
    };

    Ok((name.trim().to_string(), RailMetric::electrical(voltage, current)))
}

/// Parse the electrical report printed by the board management tool
///
/// # Errors
///
/// Returns `TelemetryError::Malformed` naming the offending line when the
/// output does not follow the layout.
pub fn parse_power_report(output: &str) -> Result<PowerReport, TelemetryError> {
    let lines: Vec<&str> = output.lines().collect();

    let max_power = first_number::<u32>(
        field_value(line_at(&lines, MAX_POWER_LINE)?, MAX_POWER_LINE)?,
        MAX_POWER_LINE,
    )?;
    let total_power = first_number::<f64>(
        field_value(line_at(&lines, POWER_LINE)?, POWER_LINE)?,
        POWER_LINE,
    )?;
    let power_warning = field_value(line_at(&lines, WARNING_LINE)?, WARNING_LINE)?.to_string();

    let mut rails = BTreeMap::new();
    for (index, line) in lines.iter().enumerate().skip(LAST_HEADER_LINE + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let (name, metric) = parse_rail(line, index)?;
        rails.insert(name, metric);
    }

    Ok(PowerReport {
        max_power: Some(max_power),
        total_power,
        power_warning: Some(power_warning),
        rails,
    })
}
