//! Accelerator power profiling harness
//!
//! Drives an accelerator binding back to back while a concurrent sampler
//! polls an out-of-band power probe, and returns the time-ordered readings.

pub mod bench;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod output;
pub mod sampler;
pub mod session;
pub mod signal;
pub mod telemetry;
pub mod timing;

pub use config::SessionConfig;
pub use device::{DeviceBinding, ElementType, ExecutionParameters, HostArray};
pub use driver::TransferMode;
pub use error::{HarnessError, Result};
pub use session::ProfilingSession;
pub use signal::StopSignal;
pub use telemetry::{TelemetryKind, TelemetrySource};
pub use timing::{Phase, TimingRecorder, TimingSummary};

use anyhow::Context;
use device::{Overlay, SoftwareBinding};
use tracing::info;
use wattprobe_shared::types::table::PowerTable;
use wattprobe_shared::types::telemetry::TelemetryBuffer;

/// Result of a completed profiling run
#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    pub buffer: TelemetryBuffer,
    pub table: PowerTable,
    pub timings: TimingSummary,
    pub driver_iterations: u64,
}

/// Open a session as configured.
///
/// Measures the initialize phase (overlay load and kernel lookup) and the
/// buffer allocation phase. Element types are resolved before anything is
/// allocated.
pub fn open_session(config: &SessionConfig) -> anyhow::Result<ProfilingSession> {
    let parameters = config.execution_parameters()?;
    let mut timings = TimingRecorder::new();

    let kernel = timings.timed(Phase::Initialize, || {
        let overlay = match &config.kernel.overlay {
            Some(path) => Overlay::load(path)?,
            None => Overlay::builtin(),
        };
        overlay.kernel(&config.kernel.name)
    })?;

    let binding = timings.timed(Phase::AllocateBuffers, || {
        SoftwareBinding::allocate(kernel, parameters)
    })?;

    let kind = config.telemetry_kind()?;
    let source = telemetry::open_source(kind, &config.telemetry.device)
        .with_context(|| format!("Failed to open {} telemetry", kind))?;

    info!(
        "Session ready: kernel {} ({} x {}), telemetry {}",
        config.kernel.name,
        parameters.sequence_length(),
        parameters.feature_count(),
        kind
    );

    Ok(ProfilingSession::new(Box::new(binding), source)
        .with_settle_delay(config.collection.settle_delay)
        .with_timings(timings))
}

/// Run a full profiling collection and write the configured outputs
pub fn run_profile(config: &SessionConfig) -> anyhow::Result<ProfileOutcome> {
    config.validate().context("Invalid configuration")?;

    let mut session = open_session(config)?;
    let buffer = session
        .collect(config.collection.duration, config.collection.include_transfers)
        .context("Profiling session failed")?;

    let table = PowerTable::from_readings(&buffer.readings, &config.output.rails);

    if let Some(path) = &config.output.json_output {
        output::json::generate_json(&buffer, path)?;
    }
    if let Some(path) = &config.output.csv_output {
        output::table::generate_csv(&table, path)?;
    }

    Ok(ProfileOutcome {
        driver_iterations: session
            .last_driver_report()
            .map(|r| r.iterations)
            .unwrap_or_default(),
        timings: session.timings().summary(),
        buffer,
        table,
    })
}
