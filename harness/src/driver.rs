//! Continuous driver
//!
//! Keeps the accelerator saturated for the length of a collection session so
//! that sampled power reflects steady-state load. The loop runs back to back
//! with no pacing and stops only when the stop signal is raised.

use crate::device::{DeviceBinding, HostArray};
use crate::error::Result;
use crate::signal::StopSignal;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Whether host/device transfers are part of each loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Transfer once before and once after the loop; iterate `execute` only
    Exclusive,
    /// Transfer in, execute and transfer out on every iteration
    Inclusive,
}

impl TransferMode {
    pub fn from_include_transfers(include_transfers: bool) -> Self {
        if include_transfers {
            Self::Inclusive
        } else {
            Self::Exclusive
        }
    }
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exclusive => write!(f, "transfer-exclusive"),
            Self::Inclusive => write!(f, "transfer-inclusive"),
        }
    }
}

/// Lifecycle of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Priming,
    Looping,
    Stopped,
}

/// Outcome of a completed driver loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverReport {
    /// Completed loop iterations
    pub iterations: u64,

    /// Time spent looping
    pub elapsed: Duration,
}

impl DriverReport {
    /// Iterations per second
    pub fn rate_hz(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.iterations as f64 / secs
        }
    }
}

/// Drives a binding in a tight loop until stopped
#[derive(Debug)]
pub struct ContinuousDriver<'a> {
    binding: &'a mut dyn DeviceBinding,
    mode: TransferMode,
    state: DriverState,
}

impl<'a> ContinuousDriver<'a> {
    pub fn new(binding: &'a mut dyn DeviceBinding, mode: TransferMode) -> Self {
        Self {
            binding,
            mode,
            state: DriverState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> DriverState {
        self.state
    }

    fn enter(&mut self, state: DriverState) {
        debug!("Driver {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Prime the input buffer once, then loop until `stop` is raised.
    ///
    /// Any binding error ends the loop and is returned; the accelerator is
    /// not retried.
    pub fn run(&mut self, stop: &StopSignal) -> Result<DriverReport> {
        self.enter(DriverState::Priming);
        let parameters = *self.binding.parameters();
        let batch = HostArray::random(
            parameters.input_type(),
            parameters.in_out_size(),
            &mut rand::thread_rng(),
        );
        self.binding.transfer_in(&batch)?;

        self.enter(DriverState::Looping);
        info!("Driving accelerator ({})", self.mode);

        let start = Instant::now();
        let mut iterations = 0u64;
        while !stop.is_raised() {
            match self.mode {
                TransferMode::Exclusive => self.binding.execute()?,
                TransferMode::Inclusive => {
                    self.binding.sync_input()?;
                    self.binding.execute()?;
                    self.binding.transfer_out()?;
                }
            }
            iterations += 1;
        }
        let elapsed = start.elapsed();

        self.enter(DriverState::Stopped);
        if self.mode == TransferMode::Exclusive {
            // Flush the last result
            self.binding.transfer_out()?;
        }

        let report = DriverReport {
            iterations,
            elapsed,
        };
        info!(
            "Driver stopped after {} iterations ({:.1} it/s)",
            report.iterations,
            report.rate_hz()
        );
        Ok(report)
    }
}
