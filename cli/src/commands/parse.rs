//! Parse command implementation

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use wattprobe_harness::telemetry::parse_power_report;

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Captured report; `-` reads standard input
    pub file: PathBuf,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

pub fn run(args: ParseArgs) -> Result<()> {
    let text = if args.file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read standard input")?
    } else {
        std::fs::read_to_string(&args.file)
            .with_context(|| format!("Failed to read {}", args.file.display()))?
    };

    let report = parse_power_report(&text).context("Failed to parse telemetry report")?;

    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", json);

    output::power_warning(report.power_warning.as_deref());
    output::info(format!(
        "{} total across {} rails",
        output::watts(report.total_power),
        report.rails.len()
    ));

    Ok(())
}
