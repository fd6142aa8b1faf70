//! Power summary table
//!
//! Flattens telemetry readings into rows of `time`, total power and one power
//! column per rail of interest, sorted ascending by time. This is the shape
//! consumed by plotting and reporting tools.

use crate::types::telemetry::TelemetryReading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the power table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerRow {
    /// Capture time of the reading
    pub time: DateTime<Utc>,

    /// Total power in watts
    pub power: f64,

    /// Power per rail of interest, in table column order
    pub rail_powers: Vec<Option<f64>>,
}

/// Time-sorted power table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerTable {
    /// Rails of interest, one column each
    pub rails: Vec<String>,

    /// Rows sorted by ascending time
    pub rows: Vec<PowerRow>,
}

impl PowerTable {
    /// Build a table from readings, keeping only the named rails.
    ///
    /// Rails missing from a reading (or lacking current) yield empty cells.
    pub fn from_readings<S: AsRef<str>>(readings: &[TelemetryReading], rails: &[S]) -> Self {
        let rails: Vec<String> = rails.iter().map(|r| r.as_ref().to_string()).collect();

        let mut ordered: Vec<&TelemetryReading> = readings.iter().collect();
        ordered.sort_by(|a, b| {
            a.capture_time
                .cmp(&b.capture_time)
                .then(a.offset_ns.cmp(&b.offset_ns))
        });

        let rows = ordered
            .into_iter()
            .map(|reading| PowerRow {
                time: reading.capture_time,
                power: reading.total_power,
                rail_powers: rails.iter().map(|rail| reading.rail_power(rail)).collect(),
            })
            .collect();

        Self { rails, rows }
    }

    /// Column headers: `time`, `Power`, then `<rail> Power` per rail
    pub fn column_names(&self) -> Vec<String> {
        let mut columns = vec!["time".to_string(), "Power".to_string()];
        columns.extend(self.rails.iter().map(|rail| format!("{} Power", rail)));
        columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::telemetry::{PowerReport, RailMetric};
    use chrono::Duration;

    fn reading_at(time: DateTime<Utc>, power: f64, aux_current: Option<f64>) -> TelemetryReading {
        let mut report = PowerReport {
            total_power: power,
            ..Default::default()
        };
        report.rails.insert(
            "12 Volts Auxillary".to_string(),
            RailMetric::electrical(12.0, aux_current),
        );
        TelemetryReading::new(report, time, 0)
    }

    #[test]
    fn test_rows_sorted_by_time() {
        let base = Utc::now();
        let readings = vec![
            reading_at(base + Duration::milliseconds(20), 3.0, Some(1.0)),
            reading_at(base, 1.0, Some(1.0)),
            reading_at(base + Duration::milliseconds(10), 2.0, Some(1.0)),
        ];

        let table = PowerTable::from_readings(&readings, &["12 Volts Auxillary"]);
        let powers: Vec<f64> = table.rows.iter().map(|r| r.power).collect();
        assert_eq!(powers, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_rail_columns() {
        let readings = vec![reading_at(Utc::now(), 30.0, Some(0.5))];
        let table = PowerTable::from_readings(&readings, &["12 Volts Auxillary", "Internal FPGA Vcc"]);

        assert_eq!(
            table.column_names(),
            vec![
                "time",
                "Power",
                "12 Volts Auxillary Power",
                "Internal FPGA Vcc Power"
            ]
        );
        assert_eq!(table.rows[0].rail_powers, vec![Some(6.0), None]);
    }

    #[test]
    fn test_missing_current_is_empty_cell() {
        let readings = vec![reading_at(Utc::now(), 30.0, None)];
        let table = PowerTable::from_readings(&readings, &["12 Volts Auxillary"]);
        assert_eq!(table.rows[0].rail_powers, vec![None]);
    }
}
