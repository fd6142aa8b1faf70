//! GPU telemetry via `nvidia-smi`

use crate::telemetry::{run_command, TelemetryError, TelemetrySource};
use wattprobe_shared::types::telemetry::PowerReport;

/// Telemetry source reporting board power of one GPU
#[derive(Debug, Clone)]
pub struct NvidiaSmiSource {
    index: String,
}

impl NvidiaSmiSource {
    /// Source for the GPU at `index` (defaults to 0 when empty)
    pub fn new(index: impl Into<String>) -> Self {
        let index = index.into();
        Self {
            index: if index.is_empty() { "0".to_string() } else { index },
        }
    }
}

impl TelemetrySource for NvidiaSmiSource {
    fn name(&self) -> &str {
        "nvidia-smi"
    }

    fn query(&mut self) -> Result<PowerReport, TelemetryError> {
        let stdout = run_command(
            "nvidia-smi",
            &[
                "--query-gpu=power.draw,power.limit",
                "--format=csv,noheader,nounits",
                "-i",
                &self.index,
            ],
        )?;
        parse_power_query(&stdout)
    }
}

/// Parse `power.draw,power.limit` CSV output (no header, no units)
pub fn parse_power_query(raw: &str) -> Result<PowerReport, TelemetryError> {
    let (index, line) = raw
        .lines()
        .enumerate()
        .find(|(_, line)| !line.trim().is_empty())
        .ok_or_else(|| TelemetryError::unavailable("nvidia-smi reported no GPU"))?;

    let columns: Vec<&str> = line.split(',').map(str::trim).collect();

    let draw = columns[0];
    if draw.starts_with('[') {
        // "[N/A]" or "[Not Supported]"
        return Err(TelemetryError::unavailable(format!("power.draw is {}", draw)));
    }
    let total_power: f64 = draw
        .parse()
        .map_err(|_| TelemetryError::malformed(index, format!("invalid power.draw '{}'", draw)))?;

    let max_power = columns
        .get(1)
        .and_then(|limit| limit.parse::<f64>().ok())
        .map(|limit| limit.round() as u32);

    Ok(PowerReport {
        max_power,
        total_power,
        power_warning: None,
        rails: Default::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_draw_and_limit() {
        let report = parse_power_query("71.42, 300.00\n").unwrap();
        assert!((report.total_power - 71.42).abs() < 1e-9);
        assert_eq!(report.max_power, Some(300));
        assert!(report.rails.is_empty());
    }

    #[test]
    fn test_limit_not_supported() {
        let report = parse_power_query("35.10, [N/A]").unwrap();
        assert_eq!(report.max_power, None);
    }

    #[test]
    fn test_draw_not_supported() {
        let err = parse_power_query("[N/A], [N/A]").unwrap_err();
        assert!(matches!(err, TelemetryError::Unavailable { .. }));
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_power_query("\n\n").is_err());
    }

    #[test]
    fn test_garbage() {
        let err = parse_power_query("\nabc, 1").unwrap_err();
        assert!(matches!(err, TelemetryError::Malformed { line: 1, .. }));
    }
}
