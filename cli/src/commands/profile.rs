//! Profile command implementation

use crate::commands::SessionArgs;
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;
use wattprobe_harness::output::table::generate_report;
use wattprobe_shared::utils::parse_duration;

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Sampling window after the settle delay (e.g., "10s", "1.5m")
    #[arg(short = 'D', long)]
    pub duration: Option<String>,

    /// Pause before the first sample (e.g., "1s", "250ms")
    #[arg(long)]
    pub settle: Option<String>,

    /// Include host/device transfers in every driver iteration
    #[arg(long)]
    pub transfers: bool,

    /// Write the raw telemetry buffer as JSON
    #[arg(long)]
    pub json: Option<String>,

    /// Write the power table as CSV
    #[arg(long)]
    pub csv: Option<String>,

    /// Rail to give its own power column (repeatable)
    #[arg(short, long = "rail")]
    pub rails: Vec<String>,
}

pub async fn run(args: ProfileArgs) -> Result<()> {
    let mut config = args.session.load_config()?;

    if let Some(duration) = &args.duration {
        config.collection.duration = parse_duration(duration).context("Failed to parse duration")?;
    }
    if let Some(settle) = &args.settle {
        config.collection.settle_delay =
            parse_duration(settle).context("Failed to parse settle delay")?;
    }
    if args.transfers {
        config.collection.include_transfers = true;
    }
    if args.json.is_some() {
        config.output.json_output = args.json;
    }
    if args.csv.is_some() {
        config.output.csv_output = args.csv;
    }
    if !args.rails.is_empty() {
        config.output.rails = args.rails;
    }
    config.validate().context("Invalid configuration")?;
    debug!("Configuration: {:?}", config);

    let spinner = output::spinner(format!(
        "Profiling {} for {:.1}s",
        config.kernel.name,
        (config.collection.settle_delay + config.collection.duration).as_secs_f64()
    ));

    let session_config = config.clone();
    let outcome =
        tokio::task::spawn_blocking(move || wattprobe_harness::run_profile(&session_config))
            .await
            .context("Profiling task failed")?;
    spinner.finish_and_clear();
    let outcome = outcome?;

    let mut report = Vec::new();
    generate_report(&outcome.buffer, &outcome.table, &mut report)?;
    print!("{}", String::from_utf8_lossy(&report));
    println!("Driver iterations: {}", outcome.driver_iterations);
    println!("{}", outcome.timings);

    if outcome.buffer.failed_queries > 0 {
        output::warning(format!(
            "{} telemetry queries failed and were skipped",
            outcome.buffer.failed_queries
        ));
    }
    if let Some(path) = &config.output.json_output {
        output::written("Telemetry", path);
    }
    if let Some(path) = &config.output.csv_output {
        output::written("Power table", path);
    }

    Ok(())
}
