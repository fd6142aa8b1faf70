//! Error types for harness operations

use crate::device::ElementType;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that can occur while configuring or driving a profiling session
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Element type name has no fixed-width buffer mapping
    #[error("Unsupported element type: {name}")]
    UnsupportedElementType {
        /// Name that was requested
        name: String,
    },

    /// Session parameters are invalid
    #[error("Invalid configuration: {reason}")]
    Configuration {
        /// Reason for rejection
        reason: String,
    },

    /// Input length differs from the allocated buffer
    #[error("Input shape mismatch: expected ({expected},) got ({actual},)")]
    ShapeMismatch {
        /// Flattened length of the buffer
        expected: usize,
        /// Flattened length of the input
        actual: usize,
    },

    /// Input element type differs from the allocated buffer
    #[error("Input type mismatch: expected {expected} got {actual}")]
    TypeMismatch {
        /// Element type of the buffer
        expected: ElementType,
        /// Element type of the input
        actual: ElementType,
    },

    /// Host/device transfer failed
    #[error("Transfer failed: {reason}")]
    Transfer {
        /// Reason for failure
        reason: String,
    },

    /// Kernel execution failed
    #[error("Execution failed: {reason}")]
    Execution {
        /// Reason for failure
        reason: String,
    },

    /// Kernel name not present in the loaded overlay
    #[error("Kernel '{name}' not found in overlay (available: {available})")]
    UnknownKernel {
        /// Requested kernel name
        name: String,
        /// Comma-separated list of registered kernels
        available: String,
    },

    /// A session worker thread panicked
    #[error("{worker} thread panicked")]
    WorkerPanicked {
        /// Which worker died
        worker: &'static str,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a transfer error
    pub fn transfer(reason: impl Into<String>) -> Self {
        Self::Transfer {
            reason: reason.into(),
        }
    }

    /// Create an execution error
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Whether the error invalidates the accelerator for the rest of the session
    pub fn is_device_failure(&self) -> bool {
        matches!(self, Self::Transfer { .. } | Self::Execution { .. })
    }
}
