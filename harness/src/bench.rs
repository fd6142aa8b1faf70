//! Latency benchmark
//!
//! Measures the average latency of a binding with or without host/device
//! transfers in the measured window.

use crate::device::{DeviceBinding, HostArray};
use crate::driver::TransferMode;
use crate::error::{HarnessError, Result};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Latency statistics in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyReport {
    pub iterations: u32,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl LatencyReport {
    fn from_samples(samples: &[Duration]) -> Option<Self> {
        let iterations = u32::try_from(samples.len()).ok()?;
        if iterations == 0 {
            return None;
        }

        let as_ms = |d: &Duration| d.as_secs_f64() * 1000.0;
        let total: f64 = samples.iter().map(as_ms).sum();
        let min_ms = samples.iter().map(as_ms).fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().map(as_ms).fold(0.0, f64::max);

        Some(Self {
            iterations,
            mean_ms: total / f64::from(iterations),
            min_ms,
            max_ms,
        })
    }
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4} ms (min {:.4} ms, max {:.4} ms, n = {})",
            self.mean_ms, self.min_ms, self.max_ms, self.iterations
        )
    }
}

/// Average latency over `iterations` invocations.
///
/// The input is transferred once and the kernel executed `warmup` times
/// untimed. In exclusive mode each timed iteration covers `execute` and
/// `transfer_out`; in inclusive mode it also covers the transfer in.
pub fn average_latency(
    binding: &mut dyn DeviceBinding,
    input: &HostArray,
    iterations: u32,
    warmup: u32,
    mode: TransferMode,
) -> Result<LatencyReport> {
    if iterations == 0 {
        return Err(HarnessError::configuration("benchmark needs at least one iteration"));
    }

    binding.transfer_in(input)?;
    for _ in 0..warmup {
        binding.execute()?;
    }
    binding.transfer_out()?;
    debug!("Warmup done ({} executions)", warmup);

    let mut samples = Vec::with_capacity(iterations as usize);
    for _ in 0..iterations {
        let start = Instant::now();
        if mode == TransferMode::Inclusive {
            binding.sync_input()?;
        }
        binding.execute()?;
        binding.transfer_out()?;
        samples.push(start.elapsed());
    }

    let report = LatencyReport::from_samples(&samples)
        .ok_or_else(|| HarnessError::configuration("no latency samples"))?;
    info!("Average latency ({}): {}", mode, report);
    Ok(report)
}
