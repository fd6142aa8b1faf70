//! Subcommands and the session options they share

pub mod bench;
pub mod parse;
pub mod profile;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use wattprobe_harness::SessionConfig;

/// Options selecting the kernel and the telemetry source
#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Kernel entry point name
    #[arg(short, long)]
    pub kernel: Option<String>,

    /// Overlay manifest mapping entry points to implementations
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Sequence length of one input
    #[arg(long)]
    pub sequence_length: Option<usize>,

    /// Features per sequence step
    #[arg(long)]
    pub feature_count: Option<usize>,

    /// Input element type (int or float)
    #[arg(long)]
    pub input_type: Option<String>,

    /// Output element type (int or float)
    #[arg(long)]
    pub result_type: Option<String>,

    /// Telemetry source: xbutil, nvidia-smi or rapl
    #[arg(short, long, env = "WATTPROBE_TELEMETRY")]
    pub telemetry: Option<String>,

    /// Board address, GPU index or powercap root
    #[arg(short, long, env = "WATTPROBE_DEVICE")]
    pub device: Option<String>,
}

impl SessionArgs {
    /// Load the config file (or defaults) and apply flag overrides
    pub fn load_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => SessionConfig::default(),
        };

        if let Some(kernel) = &self.kernel {
            config.kernel.name = kernel.clone();
        }
        if let Some(overlay) = &self.overlay {
            config.kernel.overlay = Some(overlay.clone());
        }
        if let Some(n) = self.sequence_length {
            config.kernel.sequence_length = n;
        }
        if let Some(n) = self.feature_count {
            config.kernel.feature_count = n;
        }
        if let Some(t) = &self.input_type {
            config.kernel.input_type = t.clone();
        }
        if let Some(t) = &self.result_type {
            config.kernel.result_type = t.clone();
        }
        if let Some(kind) = &self.telemetry {
            config.telemetry.kind = kind.clone();
        }
        if let Some(device) = &self.device {
            config.telemetry.device = device.clone();
        }

        Ok(config)
    }
}
