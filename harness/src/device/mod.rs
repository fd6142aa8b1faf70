//! Device binding
//!
//! A binding owns one input and one output buffer for the lifetime of a
//! session and exposes the three steps of an invocation separately so that
//! callers can leave transfers out of a measurement.

pub mod buffer;
pub mod element;
pub mod kernel;
pub mod software;

pub use buffer::DeviceBuffer;
pub use element::{ElementType, ExecutionParameters, HostArray};
pub use kernel::{ConstantKernel, IdentityKernel, Kernel, Overlay};
pub use software::SoftwareBinding;

use crate::error::Result;
use std::fmt::Debug;

/// Execution contract of an accelerator binding.
///
/// Every call mutates the single buffer pair in place, so a binding must
/// only ever be driven from one thread at a time. `&mut self` enforces that.
pub trait DeviceBinding: Debug + Send {
    /// Shape and element types of the allocated buffers
    fn parameters(&self) -> &ExecutionParameters;

    /// Copy `input` into the input buffer and make it device-resident
    ///
    /// # Errors
    ///
    /// `ShapeMismatch`/`TypeMismatch` if `input` does not fit the buffer,
    /// `Transfer` if the copy to the device fails.
    fn transfer_in(&mut self, input: &HostArray) -> Result<()>;

    /// Make the current host input buffer device-resident again
    ///
    /// # Errors
    ///
    /// Returns a transfer error if the copy fails.
    fn sync_input(&mut self) -> Result<()>;

    /// Run the kernel over the resident buffers, blocking until it completes
    ///
    /// # Errors
    ///
    /// Returns an execution error if the device reports failure.
    fn execute(&mut self) -> Result<()>;

    /// Copy the output buffer back to host-visible memory
    ///
    /// # Errors
    ///
    /// Returns a transfer error if the copy fails.
    fn transfer_out(&mut self) -> Result<HostArray>;

    /// Transfer in, execute and transfer out as one logical unit
    ///
    /// # Errors
    ///
    /// Propagates the first failing step.
    fn run(&mut self, input: &HostArray) -> Result<HostArray> {
        self.transfer_in(input)?;
        self.execute()?;
        self.transfer_out()
    }
}
