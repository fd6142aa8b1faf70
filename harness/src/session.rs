//! Profiling session
//!
//! Owns the device binding, the telemetry source and the timing log of one
//! profiling run. [`ProfilingSession::collect`] runs the continuous driver
//! and the telemetry sampler side by side on scoped threads; the only state
//! they share is a [`StopSignal`]. The sampler's buffer is read after its
//! thread has been joined.

use crate::bench::{self, LatencyReport};
use crate::device::{DeviceBinding, ExecutionParameters, HostArray};
use crate::driver::{ContinuousDriver, DriverReport, TransferMode};
use crate::error::{HarnessError, Result};
use crate::sampler::{TelemetrySampler, DEFAULT_SETTLE_DELAY};
use crate::signal::StopSignal;
use crate::telemetry::TelemetrySource;
use crate::timing::{Phase, TimingRecorder};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use wattprobe_shared::types::telemetry::TelemetryBuffer;
use wattprobe_shared::utils::format_ms;

/// Raises the stop signal when the driver thread exits, however it exits
struct RaiseOnExit<'a>(&'a StopSignal);

impl Drop for RaiseOnExit<'_> {
    fn drop(&mut self) {
        if self.0.raise() {
            warn!("Driver exited before the sampling window closed, stopping sampler");
        }
    }
}

/// A configured binding plus the telemetry source observing it
#[derive(Debug)]
pub struct ProfilingSession {
    binding: Box<dyn DeviceBinding>,
    source: Box<dyn TelemetrySource>,
    timings: TimingRecorder,
    settle_delay: Duration,
    last_driver: Option<DriverReport>,
}

impl ProfilingSession {
    pub fn new(binding: Box<dyn DeviceBinding>, source: Box<dyn TelemetrySource>) -> Self {
        Self {
            binding,
            source,
            timings: TimingRecorder::new(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            last_driver: None,
        }
    }

    /// Override the pause before the first sample
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Carry over setup timings measured while opening the session
    pub fn with_timings(mut self, timings: TimingRecorder) -> Self {
        self.timings = timings;
        self
    }

    pub fn parameters(&self) -> &ExecutionParameters {
        self.binding.parameters()
    }

    pub fn timings(&self) -> &TimingRecorder {
        &self.timings
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Driver statistics of the most recent successful [`collect`](Self::collect)
    pub fn last_driver_report(&self) -> Option<DriverReport> {
        self.last_driver
    }

    /// Drive the binding continuously while sampling telemetry for `duration`.
    ///
    /// Blocks for the settle delay plus `duration`. Each call builds a fresh
    /// buffer and a fresh stop signal.
    ///
    /// # Errors
    ///
    /// A zero `duration` is a configuration error. A driver failure is
    /// returned once both threads have been joined; the sampler is stopped
    /// early in that case. Telemetry query failures are never errors.
    pub fn collect(&mut self, duration: Duration, include_transfers: bool) -> Result<TelemetryBuffer> {
        if duration.is_zero() {
            return Err(HarnessError::configuration("collection duration must be positive"));
        }

        let mode = TransferMode::from_include_transfers(include_transfers);
        let settle_delay = self.settle_delay;
        info!(
            "Collecting {} telemetry for {:.3}s after {} settle ({})",
            self.source.name(),
            duration.as_secs_f64(),
            format_ms(settle_delay),
            mode
        );

        let stop = StopSignal::new();
        let binding = self.binding.as_mut();
        let source = self.source.as_mut();

        let (driver_result, sampler_result) = thread::scope(|scope| {
            let stop = &stop;

            let sampler = thread::Builder::new()
                .name("wattprobe-sampler".to_string())
                .spawn_scoped(scope, move || {
                    TelemetrySampler::new(source, duration, settle_delay).run(stop)
                })?;

            let driver = match thread::Builder::new()
                .name("wattprobe-driver".to_string())
                .spawn_scoped(scope, move || {
                    let _guard = RaiseOnExit(stop);
                    ContinuousDriver::new(binding, mode).run(stop)
                }) {
                Ok(handle) => handle,
                Err(e) => {
                    stop.raise();
                    // The scope joins the sampler before returning
                    return Err(HarnessError::from(e));
                }
            };

            Ok::<_, HarnessError>((driver.join(), sampler.join()))
        })?;

        let buffer = sampler_result.map_err(|_| HarnessError::WorkerPanicked { worker: "sampler" })?;
        let report = driver_result.map_err(|_| HarnessError::WorkerPanicked { worker: "driver" })??;

        debug!(
            "Driver ran {} iterations; sampler kept {} readings",
            report.iterations,
            buffer.len()
        );
        self.last_driver = Some(report);
        Ok(buffer)
    }

    fn check_input(&self, input: &HostArray) -> Result<()> {
        let parameters = self.binding.parameters();
        if input.len() != parameters.in_out_size() {
            return Err(HarnessError::ShapeMismatch {
                expected: parameters.in_out_size(),
                actual: input.len(),
            });
        }
        if input.element_type() != parameters.input_type() {
            return Err(HarnessError::TypeMismatch {
                expected: parameters.input_type(),
                actual: input.element_type(),
            });
        }
        Ok(())
    }

    /// Run the binding once and record the run duration.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch`/`TypeMismatch` are raised before the binding is
    /// touched.
    pub fn timed_run(&mut self, input: &HostArray) -> Result<HostArray> {
        self.check_input(input)?;

        let binding = self.binding.as_mut();
        let output = self.timings.timed(Phase::Run, || binding.run(input))?;
        if let Some(elapsed) = self.timings.last_run() {
            debug!("Runtime: {}", format_ms(elapsed));
        }
        Ok(output)
    }

    /// Run the binding once without timing
    pub fn run(&mut self, input: &HostArray) -> Result<HostArray> {
        self.check_input(input)?;
        self.binding.run(input)
    }

    /// Run a long input through the binding one buffer-sized segment at a time
    /// and concatenate the outputs.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when the input length is not a multiple of the buffer
    /// length.
    pub fn run_vector(&mut self, input: &HostArray, timed: bool) -> Result<HostArray> {
        let parameters = *self.binding.parameters();
        let segment = parameters.in_out_size();

        if input.len() % segment != 0 {
            return Err(HarnessError::ShapeMismatch {
                expected: input.len().div_ceil(segment) * segment,
                actual: input.len(),
            });
        }

        let segments = input.len() / segment;
        let mut output = HostArray::zeros(parameters.result_type(), 0);
        for index in 0..segments {
            let chunk = input.slice(index * segment, segment);
            let result = if timed {
                self.timed_run(&chunk)?
            } else {
                self.run(&chunk)?
            };
            output.extend_from(&result)?;
        }

        debug!("Ran {} segments of {}", segments, segment);
        Ok(output)
    }

    /// Average latency of `iterations` executions after `warmup` untimed ones
    pub fn benchmark(
        &mut self,
        input: &HostArray,
        iterations: u32,
        warmup: u32,
        include_transfers: bool,
    ) -> Result<LatencyReport> {
        self.check_input(input)?;
        bench::average_latency(
            self.binding.as_mut(),
            input,
            iterations,
            warmup,
            TransferMode::from_include_transfers(include_transfers),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ConstantKernel, ElementType, IdentityKernel, SoftwareBinding};
    use crate::telemetry::TelemetryError;
    use std::sync::Arc;
    use wattprobe_shared::types::telemetry::PowerReport;

    #[derive(Debug)]
    struct FixedSource;

    impl TelemetrySource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn query(&mut self) -> std::result::Result<PowerReport, TelemetryError> {
            std::thread::sleep(Duration::from_millis(5));
            Ok(PowerReport {
                total_power: 42.0,
                ..Default::default()
            })
        }
    }

    fn session(kernel: Arc<dyn crate::device::Kernel>) -> ProfilingSession {
        let params =
            ExecutionParameters::new(8, 1, ElementType::Float32, ElementType::Float32).unwrap();
        let binding = SoftwareBinding::allocate(kernel, params).unwrap();
        ProfilingSession::new(Box::new(binding), Box::new(FixedSource))
            .with_settle_delay(Duration::from_millis(10))
    }

    #[test]
    fn test_timed_run_records_duration() {
        let mut session = session(Arc::new(ConstantKernel::new(0.5)));
        let output = session.timed_run(&HostArray::zeros(ElementType::Float32, 8)).unwrap();

        assert_eq!(output, HostArray::Float32(vec![0.5; 8]));
        assert_eq!(session.timings().summary().run_count, 1);
    }

    #[test]
    fn test_timed_run_rejects_wrong_shape() {
        let mut session = session(Arc::new(IdentityKernel));
        let err = session
            .timed_run(&HostArray::zeros(ElementType::Float32, 7))
            .unwrap_err();

        assert!(matches!(err, HarnessError::ShapeMismatch { expected: 8, actual: 7 }));
        assert_eq!(session.timings().summary().run_count, 0);
    }

    #[test]
    fn test_timed_run_rejects_wrong_type() {
        let mut session = session(Arc::new(IdentityKernel));
        let err = session
            .timed_run(&HostArray::zeros(ElementType::Int32, 8))
            .unwrap_err();
        assert!(matches!(err, HarnessError::TypeMismatch { .. }));
    }

    #[test]
    fn test_run_vector_concatenates_segments() {
        let mut session = session(Arc::new(IdentityKernel));
        let input = HostArray::Float32((0..24).map(|v| v as f32).collect());

        let output = session.run_vector(&input, true).unwrap();
        assert_eq!(output, input);
        assert_eq!(session.timings().summary().run_count, 3);
    }

    #[test]
    fn test_run_vector_rejects_partial_segment() {
        let mut session = session(Arc::new(IdentityKernel));
        let input = HostArray::zeros(ElementType::Float32, 12);

        let err = session.run_vector(&input, false).unwrap_err();
        assert!(matches!(err, HarnessError::ShapeMismatch { expected: 16, actual: 12 }));
    }

    #[test]
    fn test_collect_zero_duration_rejected() {
        let mut session = session(Arc::new(IdentityKernel));
        assert!(matches!(
            session.collect(Duration::ZERO, false),
            Err(HarnessError::Configuration { .. })
        ));
    }

    #[test]
    fn test_collect_records_driver_report() {
        let mut session = session(Arc::new(IdentityKernel));
        let buffer = session.collect(Duration::from_millis(50), true).unwrap();

        assert!(!buffer.is_empty());
        assert!(buffer.readings.iter().all(|r| r.total_power == 42.0));
        assert!(session.last_driver_report().unwrap().iterations > 0);
    }
}
