//! CLI for wattprobe
//!
//! Commands:
//! - profile: drive the accelerator while sampling power telemetry
//! - bench: measure average kernel latency
//! - parse: decode a captured board telemetry report

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "wattprobe")]
#[command(about = "wattprobe - accelerator power and latency profiler", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a kernel continuously and record power telemetry
    Profile(commands::profile::ProfileArgs),

    /// Measure average kernel latency
    Bench(commands::bench::BenchArgs),

    /// Parse a captured `xbutil examine --r electrical` report
    Parse(commands::parse::ParseArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Profile(args) => commands::profile::run(args).await,
        Commands::Bench(args) => commands::bench::run(args).await,
        Commands::Parse(args) => commands::parse::run(args),
    };

    if let Err(ref e) = result {
        output::error(format!("{:#}", e));
    }
    result
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
