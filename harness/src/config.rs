//! Session configuration
//!
//! Loaded from a TOML file; every section and field is optional. Defaults
//! for the telemetry device, the telemetry kind and the settle delay can be
//! overridden through `WATTPROBE_*` environment variables.

use crate::device::{ElementType, ExecutionParameters};
use crate::telemetry::TelemetryKind;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Rails tracked by the power table when none are configured
pub const DEFAULT_RAILS: [&str; 3] = [
    "12 Volts Auxillary",
    "12 Volts PCI Express",
    "Internal FPGA Vcc",
];

/// Durations are written as `"2s"`, `"500ms"`, `"1.5m"`
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}ms", value.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        wattprobe_shared::utils::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Kernel and buffer shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Entry point name in the overlay
    pub name: String,

    /// Overlay manifest; the built-in overlay when unset
    pub overlay: Option<PathBuf>,

    pub sequence_length: usize,
    pub feature_count: usize,

    /// Element type of the input buffer (`int` or `float`)
    pub input_type: String,

    /// Element type of the output buffer (`int` or `float`)
    pub result_type: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "identity".to_string(),
            overlay: None,
            sequence_length: 8,
            feature_count: 1,
            input_type: "float".to_string(),
            result_type: "float".to_string(),
        }
    }
}

/// Telemetry source selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `xbutil`, `nvidia-smi` or `rapl`
    pub kind: String,

    /// Board address, GPU index or powercap root, depending on `kind`
    pub device: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            kind: std::env::var("WATTPROBE_TELEMETRY").unwrap_or_else(|_| "xbutil".to_string()),
            device: std::env::var("WATTPROBE_DEVICE").unwrap_or_else(|_| "0000:bf:00.1".to_string()),
        }
    }
}

/// Collection window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    #[serde(with = "duration_str")]
    pub duration: Duration,

    #[serde(with = "duration_str")]
    pub settle_delay: Duration,

    /// Include host/device transfers in every driver iteration
    pub include_transfers: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        let settle_ms: u64 = std::env::var("WATTPROBE_SETTLE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        Self {
            duration: Duration::from_secs(10),
            settle_delay: Duration::from_millis(settle_ms),
            include_transfers: false,
        }
    }
}

/// Latency benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub iterations: u32,
    pub warmup: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            warmup: 10,
        }
    }
}

/// Output files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Raw telemetry buffer as JSON
    pub json_output: Option<String>,

    /// Power table as CSV
    pub csv_output: Option<String>,

    /// Rails given their own column in the power table
    pub rails: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_output: None,
            csv_output: None,
            rails: DEFAULT_RAILS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Complete session configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub kernel: KernelConfig,
    pub telemetry: TelemetryConfig,
    pub collection: CollectionConfig,
    pub bench: BenchConfig,
    pub output: OutputConfig,
}

impl SessionConfig {
    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML")
    }

    /// Selected telemetry source kind
    pub fn telemetry_kind(&self) -> Result<TelemetryKind> {
        self.telemetry.kind.parse()
    }

    /// Shape and element types of the buffer pair
    pub fn execution_parameters(&self) -> Result<ExecutionParameters> {
        let input: ElementType = self.kernel.input_type.parse()?;
        let result: ElementType = self.kernel.result_type.parse()?;
        Ok(ExecutionParameters::new(
            self.kernel.sequence_length,
            self.kernel.feature_count,
            input,
            result,
        )?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.kernel.sequence_length == 0 || self.kernel.feature_count == 0 {
            bail!("Buffer shape must be non-zero");
        }

        self.execution_parameters()?;
        self.telemetry_kind()?;

        if self.collection.duration.is_zero() {
            bail!("Duration must be greater than 0");
        }

        if self.collection.settle_delay > self.collection.duration {
            warn!(
                "Settle delay ({:?}) is longer than the sampling window ({:?})",
                self.collection.settle_delay, self.collection.duration
            );
        }

        if self.bench.iterations == 0 {
            bail!("Benchmark iterations must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kernel.sequence_length, 8);
        assert_eq!(config.output.rails.len(), 3);
    }

    #[test]
    fn test_parse_toml() {
        let config = SessionConfig::from_toml(
            r#"
            [kernel]
            name = "constant"
            sequence_length = 32
            feature_count = 4
            input_type = "int"

            [telemetry]
            kind = "rapl"
            device = "/sys/class/powercap"

            [collection]
            duration = "2s"
            settle_delay = "250ms"
            include_transfers = true

            [output]
            rails = ["package-0"]
            "#,
        )
        .unwrap();

        assert_eq!(config.kernel.name, "constant");
        assert_eq!(config.kernel.result_type, "float");
        assert_eq!(config.telemetry_kind().unwrap(), TelemetryKind::Rapl);
        assert_eq!(config.collection.duration, Duration::from_secs(2));
        assert_eq!(config.collection.settle_delay, Duration::from_millis(250));
        assert!(config.collection.include_transfers);
        assert_eq!(config.output.rails, vec!["package-0".to_string()]);
        assert_eq!(config.bench, BenchConfig::default());

        let params = config.execution_parameters().unwrap();
        assert_eq!(params.in_out_size(), 128);
        assert_eq!(params.input_type(), ElementType::Int32);
    }

    #[test]
    fn test_unknown_element_type() {
        let mut config = SessionConfig::default();
        config.kernel.input_type = "complex".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_shape() {
        let mut config = SessionConfig::default();
        config.kernel.feature_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_duration() {
        let mut config = SessionConfig::default();
        config.collection.duration = Duration::ZERO;
        config.collection.settle_delay = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settle_longer_than_window_is_accepted() {
        let mut config = SessionConfig::default();
        config.collection.duration = Duration::from_millis(500);
        config.collection.settle_delay = Duration::from_secs(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_unknown_telemetry() {
        let mut config = SessionConfig::default();
        config.telemetry.kind = "multimeter".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_duration_string() {
        let result = SessionConfig::from_toml("[collection]\nduration = \"soon\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wattprobe.toml");
        std::fs::write(&path, "[bench]\niterations = 50\n").unwrap();

        let config = SessionConfig::from_file(&path).unwrap();
        assert_eq!(config.bench.iterations, 50);
        assert_eq!(config.bench.warmup, 10);
    }
}
