//! Bench command implementation

use crate::commands::SessionArgs;
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use wattprobe_harness::{open_session, HostArray};
use wattprobe_shared::utils::format_ms;

#[derive(Args, Debug)]
pub struct BenchArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Timed iterations
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Untimed executions before measuring
    #[arg(short, long)]
    pub warmup: Option<u32>,

    /// Include host/device transfers in each timed iteration
    #[arg(long)]
    pub transfers: bool,

    /// Full runs to record in the timing log
    #[arg(long, default_value = "10")]
    pub runs: usize,

    /// Print every recorded run
    #[arg(long)]
    pub list_runs: bool,
}

pub async fn run(args: BenchArgs) -> Result<()> {
    let mut config = args.session.load_config()?;
    if let Some(n) = args.iterations {
        config.bench.iterations = n;
    }
    if let Some(n) = args.warmup {
        config.bench.warmup = n;
    }
    config.validate().context("Invalid configuration")?;

    let spinner = output::spinner(format!(
        "Benchmarking {} ({} iterations)",
        config.kernel.name, config.bench.iterations
    ));

    let transfers = args.transfers;
    let runs = args.runs;
    let result = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut session = open_session(&config)?;
        let parameters = *session.parameters();
        let input = HostArray::random(
            parameters.input_type(),
            parameters.in_out_size(),
            &mut rand::thread_rng(),
        );

        let latency =
            session.benchmark(&input, config.bench.iterations, config.bench.warmup, transfers)?;
        for _ in 0..runs {
            session.timed_run(&input)?;
        }
        Ok((latency, session.timings().clone()))
    })
    .await
    .context("Benchmark task failed")?;
    spinner.finish_and_clear();
    let (latency, timings) = result?;

    let mode = if transfers { "with transfers" } else { "without transfers" };
    output::success(format!("Average latency {}: {}", mode, latency));
    println!("{}", timings.summary());

    if args.list_runs {
        for (i, run) in timings.log().runs.iter().enumerate() {
            println!("  run {:>4}: {}", i + 1, format_ms(*run));
        }
    }

    Ok(())
}
