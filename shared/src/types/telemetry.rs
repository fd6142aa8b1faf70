//! Telemetry data structures
//!
//! A telemetry source answers each query with a [`PowerReport`]. The sampler
//! stamps the report with its capture time and turns it into a
//! [`TelemetryReading`]; the readings of one collection window form a
//! [`TelemetryBuffer`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Electrical values reported for a single power rail.
///
/// Board tools report voltage and (usually) current; energy-counter sources
/// report a derived power figure only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RailMetric {
    /// Rail voltage in volts
    pub voltage: Option<f64>,

    /// Rail current in amperes
    pub current: Option<f64>,

    /// Power reported directly by the source, in watts
    pub power: Option<f64>,
}

impl RailMetric {
    /// A rail reported as voltage and optional current
    pub fn electrical(voltage: f64, current: Option<f64>) -> Self {
        Self {
            voltage: Some(voltage),
            current,
            power: None,
        }
    }

    /// A rail reported as power only
    pub fn power_only(watts: f64) -> Self {
        Self {
            voltage: None,
            current: None,
            power: Some(watts),
        }
    }

    /// Power drawn on this rail in watts.
    ///
    /// Uses the reported power when present, otherwise voltage × current.
    pub fn watts(&self) -> Option<f64> {
        match (self.power, self.voltage, self.current) {
            (Some(p), _, _) => Some(p),
            (None, Some(v), Some(i)) => Some(v * i),
            _ => None,
        }
    }
}

/// One answer from a telemetry source, before it is timestamped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerReport {
    /// Board power limit in watts, if the source reports one
    pub max_power: Option<u32>,

    /// Instantaneous total power in watts
    pub total_power: f64,

    /// Free-form warning flag reported by the source
    pub power_warning: Option<String>,

    /// Per-rail measurements keyed by rail name
    pub rails: BTreeMap<String, RailMetric>,
}

/// A timestamped power sample. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    /// Wall-clock time at which the report was captured
    pub capture_time: DateTime<Utc>,

    /// Monotonic offset from the start of the sampling loop, in nanoseconds
    pub offset_ns: u64,

    /// Instantaneous total power in watts
    pub total_power: f64,

    /// Board power limit in watts, if known
    pub max_power: Option<u32>,

    /// Warning flag reported alongside the sample
    pub power_warning: Option<String>,

    /// Per-rail measurements keyed by rail name
    pub rails: BTreeMap<String, RailMetric>,
}

impl TelemetryReading {
    /// Stamp a report with its capture time and loop offset
    pub fn new(report: PowerReport, capture_time: DateTime<Utc>, offset_ns: u64) -> Self {
        Self {
            capture_time,
            offset_ns,
            total_power: report.total_power,
            max_power: report.max_power,
            power_warning: report.power_warning,
            rails: report.rails,
        }
    }

    /// Power drawn on a named rail, if the rail was reported
    pub fn rail_power(&self, rail: &str) -> Option<f64> {
        self.rails.get(rail).and_then(RailMetric::watts)
    }
}

/// The readings gathered during a single collection window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryBuffer {
    /// Readings in capture order
    pub readings: Vec<TelemetryReading>,

    /// Number of queries that failed and were skipped
    pub failed_queries: u64,

    /// Settle delay that preceded the sampling loop, in nanoseconds
    pub settle_ns: u64,

    /// Measured length of the sampling loop, in nanoseconds
    pub window_ns: u64,
}

impl TelemetryBuffer {
    /// Number of readings
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether no reading was captured
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Time between the first and last reading, in nanoseconds
    pub fn span_ns(&self) -> u64 {
        match (self.readings.first(), self.readings.last()) {
            (Some(first), Some(last)) => last.offset_ns.saturating_sub(first.offset_ns),
            _ => 0,
        }
    }

    /// Check that capture offsets never decrease
    pub fn is_ordered(&self) -> bool {
        self.readings
            .windows(2)
            .all(|pair| pair[0].offset_ns <= pair[1].offset_ns)
    }

    /// Mean total power over all readings
    pub fn mean_power(&self) -> Option<f64> {
        if self.readings.is_empty() {
            return None;
        }
        let sum: f64 = self.readings.iter().map(|r| r.total_power).sum();
        Some(sum / self.readings.len() as f64)
    }

    /// Highest total power observed
    pub fn peak_power(&self) -> Option<f64> {
        self.readings
            .iter()
            .map(|r| r.total_power)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))
    }

    /// Achieved sampling rate over the window in Hz
    pub fn sample_rate_hz(&self) -> f64 {
        if self.window_ns == 0 {
            0.0
        } else {
            self.readings.len() as f64 * 1_000_000_000.0 / self.window_ns as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(offset_ns: u64, power: f64) -> TelemetryReading {
        TelemetryReading::new(
            PowerReport {
                total_power: power,
                ..Default::default()
            },
            Utc::now(),
            offset_ns,
        )
    }

    #[test]
    fn test_rail_watts_from_voltage_and_current() {
        let rail = RailMetric::electrical(12.0, Some(1.5));
        assert!((rail.watts().unwrap() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_rail_without_current_has_no_power() {
        let rail = RailMetric::electrical(0.85, None);
        assert_eq!(rail.watts(), None);
    }

    #[test]
    fn test_rail_reported_power_wins() {
        let rail = RailMetric {
            voltage: Some(12.0),
            current: Some(1.0),
            power: Some(3.0),
        };
        assert_eq!(rail.watts(), Some(3.0));
    }

    #[test]
    fn test_buffer_statistics() {
        let buffer = TelemetryBuffer {
            readings: vec![reading(0, 10.0), reading(500, 20.0), reading(1000, 30.0)],
            failed_queries: 2,
            settle_ns: 0,
            window_ns: 1000,
        };

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.span_ns(), 1000);
        assert!(buffer.is_ordered());
        assert!((buffer.mean_power().unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(buffer.peak_power(), Some(30.0));
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = TelemetryBuffer::default();
        assert!(buffer.is_empty());
        assert_eq!(buffer.span_ns(), 0);
        assert_eq!(buffer.mean_power(), None);
        assert_eq!(buffer.peak_power(), None);
        assert_eq!(buffer.sample_rate_hz(), 0.0);
    }

    #[test]
    fn test_out_of_order_detected() {
        let buffer = TelemetryBuffer {
            readings: vec![reading(10, 1.0), reading(5, 1.0)],
            ..Default::default()
        };
        assert!(!buffer.is_ordered());
    }

    #[test]
    fn test_reading_serializes() {
        let mut report = PowerReport {
            total_power: 45.3,
            ..Default::default()
        };
        report
            .rails
            .insert("12 Volts PCI Express".to_string(), RailMetric::electrical(12.1, Some(2.0)));
        let reading = TelemetryReading::new(report, Utc::now(), 42);

        let json = serde_json::to_string(&reading).unwrap();
        let back: TelemetryReading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }
}
