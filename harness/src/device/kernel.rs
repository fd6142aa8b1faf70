//! Kernels and overlays
//!
//! An [`Overlay`] is a loaded hardware configuration: a set of named kernel
//! entry points. Each [`Kernel`] takes exactly two buffers (input, output)
//! and returns once the computation has completed.

use crate::device::element::HostArray;
use crate::error::{HarnessError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Synchronous kernel entry point
pub trait Kernel: Debug + Send + Sync {
    /// Compute `output` from `input`, blocking until done
    ///
    /// # Errors
    ///
    /// Returns an execution error if the computation cannot complete.
    fn call(&self, input: &HostArray, output: &mut HostArray) -> Result<()>;
}

/// Copies the input to the output, converting the element type if needed
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityKernel;

impl Kernel for IdentityKernel {
    fn call(&self, input: &HostArray, output: &mut HostArray) -> Result<()> {
        output
            .copy_from(&input.converted_to(output.element_type()))
            .map_err(|e| HarnessError::execution(format!("identity kernel: {}", e)))
    }
}

/// Fills the output with a fixed value regardless of input
#[derive(Debug, Clone, Copy)]
pub struct ConstantKernel {
    value: f32,
}

impl ConstantKernel {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Kernel for ConstantKernel {
    fn call(&self, _input: &HostArray, output: &mut HostArray) -> Result<()> {
        match output {
            HostArray::Int32(v) => v.fill(self.value as i32),
            HostArray::Float32(v) => v.fill(self.value),
        }
        Ok(())
    }
}

/// Built-in kernel implementations an overlay manifest can refer to
fn builtin_kernel(implementation: &str) -> Option<Arc<dyn Kernel>> {
    match implementation {
        "identity" => Some(Arc::new(IdentityKernel)),
        "constant" | "zeros" => Some(Arc::new(ConstantKernel::new(0.0))),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct OverlayManifest {
    #[serde(default)]
    name: Option<String>,
    kernels: BTreeMap<String, String>,
}

/// A loaded hardware configuration exposing named kernels
#[derive(Debug, Clone)]
pub struct Overlay {
    name: String,
    kernels: BTreeMap<String, Arc<dyn Kernel>>,
}

impl Overlay {
    /// Create an empty overlay
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kernels: BTreeMap::new(),
        }
    }

    /// Overlay with the built-in kernels registered under their own names
    pub fn builtin() -> Self {
        let mut overlay = Self::new("builtin");
        overlay.register("identity", Arc::new(IdentityKernel));
        overlay.register("constant", Arc::new(ConstantKernel::new(0.0)));
        overlay
    }

    /// Load an overlay manifest mapping entry-point names to implementations.
    ///
    /// ```toml
    /// name = "autoencoder"
    ///
    /// [kernels]
    /// lstm_1 = "identity"
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading overlay manifest: {}", path.display());

        let text = std::fs::read_to_string(path)?;
        let manifest: OverlayManifest = toml::from_str(&text).map_err(|e| {
            HarnessError::configuration(format!("invalid overlay {}: {}", path.display(), e))
        })?;

        let name = manifest
            .name
            .unwrap_or_else(|| path.display().to_string());
        let mut overlay = Self::new(name);

        for (entry, implementation) in manifest.kernels {
            let kernel = builtin_kernel(&implementation).ok_or_else(|| {
                HarnessError::configuration(format!(
                    "kernel '{}' uses unknown implementation '{}'",
                    entry, implementation
                ))
            })?;
            debug!("Overlay entry {} -> {}", entry, implementation);
            overlay.register(entry, kernel);
        }

        Ok(overlay)
    }

    /// Register a kernel under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, kernel: Arc<dyn Kernel>) {
        self.kernels.insert(name.into(), kernel);
    }

    /// Look up a kernel entry point
    pub fn kernel(&self, name: &str) -> Result<Arc<dyn Kernel>> {
        self.kernels
            .get(name)
            .cloned()
            .ok_or_else(|| HarnessError::UnknownKernel {
                name: name.to_string(),
                available: self.kernel_names().join(", "),
            })
    }

    /// Registered entry-point names
    pub fn kernel_names(&self) -> Vec<String> {
        self.kernels.keys().cloned().collect()
    }

    /// Overlay name
    pub fn name(&self) -> &str {
        &self.name
    }
}
