//! Output writers for collected telemetry

pub mod json;
pub mod table;

pub use json::generate_json;
pub use table::{generate_csv, generate_report};
