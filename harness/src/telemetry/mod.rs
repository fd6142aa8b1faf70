//! Telemetry sources
//!
//! A telemetry source is an out-of-band probe answering each query with a
//! power report. Queries may fail transiently; the sampler logs and skips
//! those failures.

pub mod nvidia;
pub mod rapl;
pub mod xbutil;

pub use nvidia::NvidiaSmiSource;
pub use rapl::RaplSource;
pub use xbutil::{parse_power_report, XbutilSource};

use std::fmt::Debug;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use wattprobe_shared::types::telemetry::PowerReport;

/// Errors raised by a single telemetry query
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The probe command could not be run or exited with an error
    #[error("command '{command}' failed: {reason}")]
    Command {
        /// Command line that was run
        command: String,
        /// Exit status and stderr, or the spawn error
        reason: String,
    },

    /// The probe output did not follow the expected layout
    #[error("malformed report at line {line}: {reason}")]
    Malformed {
        /// Zero-based line index
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// The probe has nothing to report
    #[error("telemetry unavailable: {reason}")]
    Unavailable {
        /// Reason
        reason: String,
    },

    /// I/O error reading a counter
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TelemetryError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// A queryable power probe
pub trait TelemetrySource: Debug + Send {
    /// Short name for log lines
    fn name(&self) -> &str;

    /// Take one reading
    ///
    /// # Errors
    ///
    /// Any error is treated as transient by the sampler.
    fn query(&mut self) -> Result<PowerReport, TelemetryError>;
}

/// Kind of telemetry source to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryKind {
    /// Accelerator board management tool
    Xbutil,
    /// GPU management tool
    NvidiaSmi,
    /// Linux powercap energy counters
    Rapl,
}

impl std::str::FromStr for TelemetryKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xbutil" | "alveo" | "accelerator" => Ok(TelemetryKind::Xbutil),
            "nvidia-smi" | "nvidia" | "gpu" => Ok(TelemetryKind::NvidiaSmi),
            "rapl" | "cpu" => Ok(TelemetryKind::Rapl),
            _ => anyhow::bail!("Invalid telemetry source: {}", s),
        }
    }
}

impl std::fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xbutil => write!(f, "xbutil"),
            Self::NvidiaSmi => write!(f, "nvidia-smi"),
            Self::Rapl => write!(f, "rapl"),
        }
    }
}

/// Open a telemetry source.
///
/// `device` is the board BDF for `xbutil`, the GPU index for `nvidia-smi`
/// and the powercap root directory for `rapl`.
pub fn open_source(
    kind: TelemetryKind,
    device: &str,
) -> Result<Box<dyn TelemetrySource>, TelemetryError> {
    match kind {
        TelemetryKind::Xbutil => Ok(Box::new(XbutilSource::new(device))),
        TelemetryKind::NvidiaSmi => Ok(Box::new(NvidiaSmiSource::new(device))),
        TelemetryKind::Rapl => {
            // A board address left over from another source is not a path
            let root = if device.is_empty() || !device.starts_with('/') {
                Path::new(rapl::DEFAULT_POWERCAP_ROOT)
            } else {
                Path::new(device)
            };
            Ok(Box::new(RaplSource::open(root)?))
        }
    }
}

/// Run a probe command and return its stdout
pub(crate) fn run_command(program: &str, args: &[&str]) -> Result<String, TelemetryError> {
    let command_line = format!("{} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| TelemetryError::Command {
            command: command_line.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(TelemetryError::Command {
            command: command_line,
            reason: format!("{} {}", output.status, stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|_| TelemetryError::Command {
        command: command_line,
        reason: "output was not UTF-8".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("xbutil".parse::<TelemetryKind>().unwrap(), TelemetryKind::Xbutil);
        assert_eq!("GPU".parse::<TelemetryKind>().unwrap(), TelemetryKind::NvidiaSmi);
        assert_eq!("rapl".parse::<TelemetryKind>().unwrap(), TelemetryKind::Rapl);
        assert!("thermal".parse::<TelemetryKind>().is_err());
    }

    #[test]
    fn test_missing_program_is_command_error() {
        let err = run_command("wattprobe-definitely-not-installed", &["--version"]).unwrap_err();
        assert!(matches!(err, TelemetryError::Command { .. }));
    }

    #[test]
    fn test_rapl_without_counters_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_source(TelemetryKind::Rapl, dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, TelemetryError::Unavailable { .. }));
    }
}
