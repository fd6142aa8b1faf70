//! Host-and-device visible buffers

use crate::device::element::{ElementType, HostArray};
use crate::error::{HarnessError, Result};

/// A fixed-shape, fixed-type memory region with a host copy and a device copy.
///
/// The shape and element type are set at allocation and never change.
/// `write_host` validates its input before mutating anything.
#[derive(Debug)]
pub struct DeviceBuffer {
    host: HostArray,
    device: HostArray,
    resident: bool,
}

impl DeviceBuffer {
    /// Allocate a zero-filled buffer of `len` elements
    pub fn allocate(element: ElementType, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(HarnessError::configuration("cannot allocate an empty buffer"));
        }

        Ok(Self {
            host: HostArray::zeros(element, len),
            device: HostArray::zeros(element, len),
            resident: false,
        })
    }

    /// Element type of the buffer
    pub fn element_type(&self) -> ElementType {
        self.host.element_type()
    }

    /// Flattened length of the buffer
    pub fn len(&self) -> usize {
        self.host.len()
    }

    /// Always false; empty buffers cannot be allocated
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    /// Size in bytes
    pub fn size_bytes(&self) -> usize {
        self.len() * self.element_type().width_bytes()
    }

    /// Check that `input` fits this buffer exactly
    pub fn check_compatible(&self, input: &HostArray) -> Result<()> {
        if input.len() != self.len() {
            return Err(HarnessError::ShapeMismatch {
                expected: self.len(),
                actual: input.len(),
            });
        }
        if input.element_type() != self.element_type() {
            return Err(HarnessError::TypeMismatch {
                expected: self.element_type(),
                actual: input.element_type(),
            });
        }
        Ok(())
    }

    /// Copy `input` into the host-visible region
    pub fn write_host(&mut self, input: &HostArray) -> Result<()> {
        self.check_compatible(input)?;
        self.host.copy_from(input)?;
        self.resident = false;
        Ok(())
    }

    /// Host-visible contents
    pub fn host(&self) -> &HostArray {
        &self.host
    }

    /// Device-resident contents
    pub fn device(&self) -> &HostArray {
        &self.device
    }

    /// Device-resident contents, for kernels writing their output
    pub fn device_mut(&mut self) -> &mut HostArray {
        &mut self.device
    }

    /// Whether the device copy matches the last host write
    pub fn is_resident(&self) -> bool {
        self.resident
    }

    /// Copy the host region to the device region
    pub fn sync_to_device(&mut self) -> Result<()> {
        self.device
            .copy_from(&self.host)
            .map_err(|e| HarnessError::transfer(format!("host to device: {}", e)))?;
        self.resident = true;
        Ok(())
    }

    /// Copy the device region back to the host region
    pub fn sync_from_device(&mut self) -> Result<()> {
        self.host
            .copy_from(&self.device)
            .map_err(|e| HarnessError::transfer(format!("device to host: {}", e)))?;
        self.resident = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate() {
        let buffer = DeviceBuffer::allocate(ElementType::Float32, 8).unwrap();
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.size_bytes(), 32);
        assert!(!buffer.is_resident());
        assert!(DeviceBuffer::allocate(ElementType::Int32, 0).is_err());
    }

    #[test]
    fn test_write_host_rejects_wrong_shape_without_mutation() {
        let mut buffer = DeviceBuffer::allocate(ElementType::Float32, 4).unwrap();
        buffer.write_host(&HostArray::Float32(vec![1.0; 4])).unwrap();

        let err = buffer.write_host(&HostArray::Float32(vec![2.0; 5])).unwrap_err();
        assert!(matches!(err, HarnessError::ShapeMismatch { expected: 4, actual: 5 }));
        assert_eq!(buffer.host(), &HostArray::Float32(vec![1.0; 4]));
    }

    #[test]
    fn test_write_host_rejects_wrong_type() {
        let mut buffer = DeviceBuffer::allocate(ElementType::Float32, 4).unwrap();
        let err = buffer.write_host(&HostArray::Int32(vec![1; 4])).unwrap_err();
        assert!(matches!(err, HarnessError::TypeMismatch { .. }));
    }

    #[test]
    fn test_sync_round_trip() {
        let mut buffer = DeviceBuffer::allocate(ElementType::Int32, 3).unwrap();
        buffer.write_host(&HostArray::Int32(vec![1, 2, 3])).unwrap();
        assert_eq!(buffer.device(), &HostArray::Int32(vec![0, 0, 0]));

        buffer.sync_to_device().unwrap();
        assert!(buffer.is_resident());
        assert_eq!(buffer.device(), &HostArray::Int32(vec![1, 2, 3]));
    }
}
