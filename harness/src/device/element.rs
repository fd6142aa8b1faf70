//! Element types, host arrays and execution parameters

use crate::error::{HarnessError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-width element type of a device buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// 4-byte signed integer
    Int32,
    /// 4-byte IEEE float
    Float32,
}

impl ElementType {
    /// Width of one element in bytes
    pub const fn width_bytes(self) -> usize {
        match self {
            Self::Int32 => 4,
            Self::Float32 => 4,
        }
    }
}

impl std::str::FromStr for ElementType {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "int" | "integer" | "i32" | "int32" => Ok(Self::Int32),
            "float" | "real" | "f32" | "float32" => Ok(Self::Float32),
            _ => Err(HarnessError::UnsupportedElementType {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32 => write!(f, "int32"),
            Self::Float32 => write!(f, "float32"),
        }
    }
}

/// A flat host array of one of the supported element types
#[derive(Debug, Clone, PartialEq)]
pub enum HostArray {
    Int32(Vec<i32>),
    Float32(Vec<f32>),
}

impl HostArray {
    /// Zero-filled array
    pub fn zeros(element: ElementType, len: usize) -> Self {
        match element {
            ElementType::Int32 => Self::Int32(vec![0; len]),
            ElementType::Float32 => Self::Float32(vec![0.0; len]),
        }
    }

    /// Array of uniform samples in `[0, 1)` cast to the element type
    pub fn random<R: Rng>(element: ElementType, len: usize, rng: &mut R) -> Self {
        match element {
            // Truncation matches a float-to-int cast of the samples
            ElementType::Int32 => Self::Int32((0..len).map(|_| rng.gen::<f64>() as i32).collect()),
            ElementType::Float32 => Self::Float32((0..len).map(|_| rng.gen::<f32>()).collect()),
        }
    }

    /// Element type of the array
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Int32(_) => ElementType::Int32,
            Self::Float32(_) => ElementType::Float32,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            Self::Int32(v) => v.len(),
            Self::Float32(v) => v.len(),
        }
    }

    /// Whether the array is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the array converted to another element type
    pub fn converted_to(&self, element: ElementType) -> Self {
        match (self, element) {
            (Self::Int32(v), ElementType::Int32) => Self::Int32(v.clone()),
            (Self::Float32(v), ElementType::Float32) => Self::Float32(v.clone()),
            (Self::Int32(v), ElementType::Float32) => {
                Self::Float32(v.iter().map(|&x| x as f32).collect())
            }
            (Self::Float32(v), ElementType::Int32) => {
                Self::Int32(v.iter().map(|&x| x as i32).collect())
            }
        }
    }

    /// Sub-array `[start, start + len)`
    pub fn slice(&self, start: usize, len: usize) -> Self {
        match self {
            Self::Int32(v) => Self::Int32(v[start..start + len].to_vec()),
            Self::Float32(v) => Self::Float32(v[start..start + len].to_vec()),
        }
    }

    /// Append another array of the same element type
    pub fn extend_from(&mut self, other: &HostArray) -> Result<()> {
        match (self, other) {
            (Self::Int32(dst), Self::Int32(src)) => dst.extend_from_slice(src),
            (Self::Float32(dst), Self::Float32(src)) => dst.extend_from_slice(src),
            (dst, src) => {
                return Err(HarnessError::TypeMismatch {
                    expected: dst.element_type(),
                    actual: src.element_type(),
                })
            }
        }
        Ok(())
    }

    /// Overwrite this array with `src`, which must have the same type and length
    pub fn copy_from(&mut self, src: &HostArray) -> Result<()> {
        if self.len() != src.len() {
            return Err(HarnessError::ShapeMismatch {
                expected: self.len(),
                actual: src.len(),
            });
        }
        match (self, src) {
            (Self::Int32(dst), Self::Int32(src)) => dst.copy_from_slice(src),
            (Self::Float32(dst), Self::Float32(src)) => dst.copy_from_slice(src),
            (dst, src) => {
                return Err(HarnessError::TypeMismatch {
                    expected: dst.element_type(),
                    actual: src.element_type(),
                })
            }
        }
        Ok(())
    }
}

impl From<Vec<f32>> for HostArray {
    fn from(v: Vec<f32>) -> Self {
        Self::Float32(v)
    }
}

impl From<Vec<i32>> for HostArray {
    fn from(v: Vec<i32>) -> Self {
        Self::Int32(v)
    }
}

/// Kernel shape and element types for a session. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionParameters {
    sequence_length: usize,
    feature_count: usize,
    input_type: ElementType,
    result_type: ElementType,
}

impl ExecutionParameters {
    /// Validate and build parameters
    pub fn new(
        sequence_length: usize,
        feature_count: usize,
        input_type: ElementType,
        result_type: ElementType,
    ) -> Result<Self> {
        if sequence_length == 0 {
            return Err(HarnessError::configuration("sequence_length must be positive"));
        }
        if feature_count == 0 {
            return Err(HarnessError::configuration("feature_count must be positive"));
        }
        if sequence_length.checked_mul(feature_count).is_none() {
            return Err(HarnessError::configuration("buffer size overflows usize"));
        }

        Ok(Self {
            sequence_length,
            feature_count,
            input_type,
            result_type,
        })
    }

    /// Build parameters from element type names (e.g. "real", "integer")
    pub fn from_names(
        sequence_length: usize,
        feature_count: usize,
        input_type: &str,
        result_type: &str,
    ) -> Result<Self> {
        Self::new(
            sequence_length,
            feature_count,
            input_type.parse()?,
            result_type.parse()?,
        )
    }

    /// Number of timesteps
    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Features per timestep
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Input element type
    pub fn input_type(&self) -> ElementType {
        self.input_type
    }

    /// Output element type
    pub fn result_type(&self) -> ElementType {
        self.result_type
    }

    /// Flattened length of both the input and output buffers
    pub fn in_out_size(&self) -> usize {
        self.sequence_length * self.feature_count
    }
}

impl Default for ExecutionParameters {
    fn default() -> Self {
        Self {
            sequence_length: 8,
            feature_count: 1,
            input_type: ElementType::Float32,
            result_type: ElementType::Float32,
        }
    }
}
