//! Telemetry sampler
//!
//! Waits a short settle delay, then queries the telemetry source back to back
//! until the configured window has elapsed on a monotonic clock and the
//! capture offsets of the kept readings span the whole window. Failed
//! queries are logged and skipped; they never shorten the window.

use crate::signal::StopSignal;
use crate::telemetry::TelemetrySource;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use wattprobe_shared::types::telemetry::{TelemetryBuffer, TelemetryReading};
use wattprobe_shared::utils::time::{duration_nanos, elapsed_nanos, now_utc};

/// Pause before the first sample so the driver reaches steady state
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Granularity at which the settle delay checks for an early stop
const SETTLE_POLL: Duration = Duration::from_millis(10);

/// Lifecycle of a sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Settling,
    Sampling,
    Done,
}

/// Samples a telemetry source for a fixed window
#[derive(Debug)]
pub struct TelemetrySampler<'a> {
    source: &'a mut dyn TelemetrySource,
    duration: Duration,
    settle_delay: Duration,
    state: SamplerState,
}

impl<'a> TelemetrySampler<'a> {
    pub fn new(source: &'a mut dyn TelemetrySource, duration: Duration, settle_delay: Duration) -> Self {
        Self {
            source,
            duration,
            settle_delay,
            state: SamplerState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> SamplerState {
        self.state
    }

    fn enter(&mut self, state: SamplerState) {
        debug!("Sampler {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Sleep for the settle delay, returning early if `stop` is raised
    fn settle(&self, stop: &StopSignal) {
        let deadline = Instant::now() + self.settle_delay;
        loop {
            let now = Instant::now();
            if now >= deadline || stop.is_raised() {
                return;
            }
            std::thread::sleep((deadline - now).min(SETTLE_POLL));
        }
    }

    /// Run the settle and sampling phases, then raise `stop`.
    ///
    /// The window ends early only if someone else raised `stop` first,
    /// which happens when the driver has failed.
    pub fn run(&mut self, stop: &StopSignal) -> TelemetryBuffer {
        self.enter(SamplerState::Settling);
        self.settle(stop);

        self.enter(SamplerState::Sampling);
        let mut buffer = TelemetryBuffer {
            settle_ns: duration_nanos(self.settle_delay),
            ..Default::default()
        };

        let target_ns = duration_nanos(self.duration);
        // A source that keeps failing may never cover the window
        let limit = self.duration.saturating_mul(2);

        let anchor = Instant::now();
        if !stop.is_raised() {
            loop {
                match self.source.query() {
                    Ok(report) => {
                        let reading = TelemetryReading::new(report, now_utc(), elapsed_nanos(anchor));
                        buffer.readings.push(reading);
                    }
                    Err(e) => {
                        buffer.failed_queries += 1;
                        warn!(
                            "{} query failed ({} so far): {}",
                            self.source.name(),
                            buffer.failed_queries,
                            e
                        );
                    }
                }

                let elapsed = anchor.elapsed();
                if elapsed >= self.duration
                    && (buffer.span_ns() >= target_ns || buffer.is_empty() || elapsed >= limit)
                {
                    break;
                }
                if stop.is_raised() {
                    warn!("Sampling stopped early by the session");
                    break;
                }
            }
        }
        buffer.window_ns = elapsed_nanos(anchor);

        self.enter(SamplerState::Done);
        if stop.raise() {
            debug!("Sampler raised stop signal");
        }

        info!(
            "Collected {} readings in {:.3}s ({} failed queries)",
            buffer.len(),
            buffer.window_ns as f64 / 1e9,
            buffer.failed_queries
        );
        buffer
    }
}
