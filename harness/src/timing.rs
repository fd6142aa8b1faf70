//! Phase timing
//!
//! Records how long the one-shot setup phases took and the duration of each
//! timed run, and summarises them.

use std::fmt;
use std::time::{Duration, Instant};
use wattprobe_shared::utils::format_ms;

/// A measured phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Overlay load and kernel lookup
    Initialize,
    /// Buffer allocation
    AllocateBuffers,
    /// One invocation of the kernel
    Run,
}

/// Raw timing data of a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingLog {
    pub initialize: Option<Duration>,
    pub allocate_buffers: Option<Duration>,
    pub runs: Vec<Duration>,
}

/// Accumulates phase durations
#[derive(Debug, Clone, Default)]
pub struct TimingRecorder {
    log: TimingLog,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a duration. One-shot phases are overwritten, runs are appended.
    pub fn record(&mut self, phase: Phase, duration: Duration) {
        match phase {
            Phase::Initialize => self.log.initialize = Some(duration),
            Phase::AllocateBuffers => self.log.allocate_buffers = Some(duration),
            Phase::Run => self.log.runs.push(duration),
        }
    }

    /// Time `op` and record its duration under `phase` if it succeeds
    pub fn timed<T, E>(
        &mut self,
        phase: Phase,
        op: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let start = Instant::now();
        let value = op()?;
        self.record(phase, start.elapsed());
        Ok(value)
    }

    /// Raw log
    pub fn log(&self) -> &TimingLog {
        &self.log
    }

    /// Most recent run duration
    pub fn last_run(&self) -> Option<Duration> {
        self.log.runs.last().copied()
    }

    /// Summary statistics over the recorded phases
    pub fn summary(&self) -> TimingSummary {
        let run_count = self.log.runs.len();
        let mean_run = if run_count == 0 {
            None
        } else {
            let total: Duration = self.log.runs.iter().sum();
            Some(total / u32::try_from(run_count).unwrap_or(u32::MAX))
        };

        TimingSummary {
            initialize: self.log.initialize,
            allocate_buffers: self.log.allocate_buffers,
            mean_run,
            run_count,
        }
    }
}

/// Summary of a [`TimingLog`]. Phases that never ran are `None`, not zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    pub initialize: Option<Duration>,
    pub allocate_buffers: Option<Duration>,
    pub mean_run: Option<Duration>,
    pub run_count: usize,
}

fn or_absent(value: Option<Duration>) -> String {
    value.map(format_ms).unwrap_or_else(|| "n/a".to_string())
}

impl fmt::Display for TimingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Initialize time: {}", or_absent(self.initialize))?;
        write!(f, "Allocate buffers time: {}", or_absent(self.allocate_buffers))?;
        if self.run_count > 0 {
            write!(f, "\nAverage run: {}", or_absent(self.mean_run))?;
            write!(f, "\nNumber of runs: {}", self.run_count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_phases_are_absent() {
        let recorder = TimingRecorder::new();
        let summary = recorder.summary();

        assert_eq!(summary.initialize, None);
        assert_eq!(summary.allocate_buffers, None);
        assert_eq!(summary.mean_run, None);
        assert_eq!(summary.run_count, 0);
        assert_eq!(
            summary.to_string(),
            "Initialize time: n/a\nAllocate buffers time: n/a"
        );
    }

    #[test]
    fn test_mean_over_runs() {
        let mut recorder = TimingRecorder::new();
        recorder.record(Phase::Run, Duration::from_millis(2));
        recorder.record(Phase::Run, Duration::from_millis(4));
        recorder.record(Phase::Initialize, Duration::from_millis(100));

        let summary = recorder.summary();
        assert_eq!(summary.run_count, 2);
        assert_eq!(summary.mean_run, Some(Duration::from_millis(3)));
        assert_eq!(summary.initialize, Some(Duration::from_millis(100)));
        assert!(summary.to_string().contains("Average run: 3.00 ms"));
    }

    #[test]
    fn test_one_shot_phase_overwritten() {
        let mut recorder = TimingRecorder::new();
        recorder.record(Phase::AllocateBuffers, Duration::from_millis(1));
        recorder.record(Phase::AllocateBuffers, Duration::from_millis(5));
        assert_eq!(recorder.log().allocate_buffers, Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_timed_records_only_success() {
        let mut recorder = TimingRecorder::new();

        let ok: Result<u32, String> = recorder.timed(Phase::Run, || Ok(7));
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u32, String> = recorder.timed(Phase::Run, || Err("boom".to_string()));
        assert!(err.is_err());

        assert_eq!(recorder.log().runs.len(), 1);
        assert!(recorder.last_run().is_some());
    }
}
