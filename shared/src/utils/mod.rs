//! Utility functions and helpers

pub mod time;

use anyhow::{bail, Result};
use std::time::Duration;

/// Parse a duration string (e.g., "500ms", "2s", "1.5s", "5m", "1h")
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    let (number, scale) = if let Some(num_str) = s.strip_suffix("ms") {
        (num_str, 0.001)
    } else if let Some(num_str) = s.strip_suffix('s') {
        (num_str, 1.0)
    } else if let Some(num_str) = s.strip_suffix('m') {
        (num_str, 60.0)
    } else if let Some(num_str) = s.strip_suffix('h') {
        (num_str, 3600.0)
    } else {
        // Default to seconds if no suffix
        (s, 1.0)
    };

    let value: f64 = number.trim().parse()?;
    if !value.is_finite() || value < 0.0 {
        bail!("Invalid duration: {}", s);
    }

    Duration::try_from_secs_f64(value * scale)
        .map_err(|e| anyhow::anyhow!("Invalid duration {}: {}", s, e))
}

/// Format a duration as milliseconds with two decimals
pub fn format_ms(duration: Duration) -> String {
    format!("{:.2} ms", duration.as_secs_f64() * 1000.0)
}
