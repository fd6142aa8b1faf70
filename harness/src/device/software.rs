//! Host-executed binding
//!
//! Runs an overlay kernel on the CPU over a host/device buffer pair. Used
//! for the general-purpose processor target and as a stand-in accelerator
//! when no board is attached.

use crate::device::buffer::DeviceBuffer;
use crate::device::element::{ExecutionParameters, HostArray};
use crate::device::kernel::Kernel;
use crate::device::DeviceBinding;
use crate::error::{HarnessError, Result};
use std::sync::Arc;
use tracing::debug;

/// Binding that executes a kernel on the host
#[derive(Debug)]
pub struct SoftwareBinding {
    parameters: ExecutionParameters,
    kernel: Arc<dyn Kernel>,
    input: DeviceBuffer,
    output: DeviceBuffer,
    executions: u64,
}

impl SoftwareBinding {
    /// Allocate the buffer pair for `parameters` and bind `kernel`
    pub fn allocate(kernel: Arc<dyn Kernel>, parameters: ExecutionParameters) -> Result<Self> {
        let size = parameters.in_out_size();
        let input = DeviceBuffer::allocate(parameters.input_type(), size)?;
        let output = DeviceBuffer::allocate(parameters.result_type(), size)?;

        debug!(
            "Allocated buffers: input {} x {}, output {} x {}",
            size,
            parameters.input_type(),
            size,
            parameters.result_type()
        );

        Ok(Self {
            parameters,
            kernel,
            input,
            output,
            executions: 0,
        })
    }

    /// Number of completed kernel executions
    pub fn executions(&self) -> u64 {
        self.executions
    }

    /// Input buffer
    pub fn input_buffer(&self) -> &DeviceBuffer {
        &self.input
    }

    /// Output buffer
    pub fn output_buffer(&self) -> &DeviceBuffer {
        &self.output
    }
}

impl DeviceBinding for SoftwareBinding {
    fn parameters(&self) -> &ExecutionParameters {
        &self.parameters
    }

    fn transfer_in(&mut self, input: &HostArray) -> Result<()> {
        self.input.write_host(input)?;
        self.input.sync_to_device()
    }

    fn sync_input(&mut self) -> Result<()> {
        self.input.sync_to_device()
    }

    fn execute(&mut self) -> Result<()> {
        if !self.input.is_resident() {
            return Err(HarnessError::execution(
                "input buffer has not been transferred to the device",
            ));
        }
        self.kernel.call(self.input.device(), self.output.device_mut())?;

        let size = self.parameters.in_out_size();
        let result_type = self.parameters.result_type();
        let written = self.output.device();
        if written.len() != size || written.element_type() != result_type {
            let reason = format!(
                "kernel left {} x {} in an output buffer of {} x {}",
                written.len(),
                written.element_type(),
                size,
                result_type
            );
            *self.output.device_mut() = HostArray::zeros(result_type, size);
            return Err(HarnessError::execution(reason));
        }

        self.executions += 1;
        Ok(())
    }

    fn transfer_out(&mut self) -> Result<HostArray> {
        self.output.sync_from_device()?;
        Ok(self.output.host().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::element::ElementType;
    use crate::device::kernel::{ConstantKernel, IdentityKernel};

    fn params(len: usize) -> ExecutionParameters {
        ExecutionParameters::new(len, 1, ElementType::Float32, ElementType::Float32).unwrap()
    }

    #[test]
    fn test_buffers_match_parameters() {
        let params =
            ExecutionParameters::new(8, 3, ElementType::Int32, ElementType::Float32).unwrap();
        let binding = SoftwareBinding::allocate(Arc::new(IdentityKernel), params).unwrap();

        assert_eq!(binding.input_buffer().len(), 24);
        assert_eq!(binding.output_buffer().len(), 24);
        assert_eq!(binding.input_buffer().element_type(), ElementType::Int32);
        assert_eq!(binding.output_buffer().element_type(), ElementType::Float32);
    }

    #[test]
    fn test_run_with_fixed_output() {
        let mut binding =
            SoftwareBinding::allocate(Arc::new(ConstantKernel::new(0.25)), params(8)).unwrap();

        let output = binding.run(&HostArray::Float32(vec![0.0; 8])).unwrap();
        assert_eq!(output, HostArray::Float32(vec![0.25; 8]));
        assert_eq!(binding.executions(), 1);
    }

    #[test]
    fn test_execute_requires_resident_input() {
        let mut binding = SoftwareBinding::allocate(Arc::new(IdentityKernel), params(4)).unwrap();
        let err = binding.execute().unwrap_err();
        assert!(err.is_device_failure());
    }

    #[test]
    fn test_shape_mismatch_before_execution() {
        let mut binding = SoftwareBinding::allocate(Arc::new(IdentityKernel), params(8)).unwrap();
        let err = binding.run(&HostArray::Float32(vec![0.0; 7])).unwrap_err();

        assert!(matches!(err, HarnessError::ShapeMismatch { expected: 8, actual: 7 }));
        assert_eq!(binding.executions(), 0);
    }

    #[derive(Debug)]
    struct TruncatingKernel;

    impl Kernel for TruncatingKernel {
        fn call(&self, _input: &HostArray, output: &mut HostArray) -> Result<()> {
            *output = HostArray::Float32(vec![1.0]);
            Ok(())
        }
    }

    #[test]
    fn test_kernel_cannot_resize_output() {
        let mut binding = SoftwareBinding::allocate(Arc::new(TruncatingKernel), params(4)).unwrap();
        binding.transfer_in(&HostArray::Float32(vec![0.0; 4])).unwrap();

        let err = binding.execute().unwrap_err();
        assert!(matches!(err, HarnessError::Execution { .. }));
        assert_eq!(binding.executions(), 0);
        assert_eq!(binding.output_buffer().device().len(), 4);
        assert_eq!(binding.transfer_out().unwrap().len(), 4);
    }

    #[test]
    fn test_separate_steps() {
        let mut binding = SoftwareBinding::allocate(Arc::new(IdentityKernel), params(3)).unwrap();
        binding
            .transfer_in(&HostArray::Float32(vec![1.0, 2.0, 3.0]))
            .unwrap();
        binding.execute().unwrap();
        binding.execute().unwrap();

        let output = binding.transfer_out().unwrap();
        assert_eq!(output, HostArray::Float32(vec![1.0, 2.0, 3.0]));
        assert_eq!(binding.executions(), 2);
    }
}
