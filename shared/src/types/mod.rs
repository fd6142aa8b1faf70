//! Telemetry and summary data types

pub mod table;
pub mod telemetry;
