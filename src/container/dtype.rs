//! Element types of persisted payloads and the widening order between them.

use std::fmt;
use std::io::{self, Write};

use ndarray::ArrayD;
use rustfft::num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};

/// Supported payload element types.
///
/// The variant order is the widening order used when chunks of mixed types
/// share one data file: integers below floats below complex, wider within each
/// family. The widest dtype across all chunks is chosen so no chunk narrows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl Dtype {
    pub fn byte_len(self) -> usize {
        match self {
            Dtype::Int16 => 2,
            Dtype::Int32 | Dtype::Float32 => 4,
            Dtype::Int64 | Dtype::Float64 | Dtype::Complex64 => 8,
            Dtype::Complex128 => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dtype::Int16 => "int16",
            Dtype::Int32 => "int32",
            Dtype::Int64 => "int64",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
            Dtype::Complex64 => "complex64",
            Dtype::Complex128 => "complex128",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int16" => Some(Dtype::Int16),
            "int32" => Some(Dtype::Int32),
            "int64" => Some(Dtype::Int64),
            "float32" => Some(Dtype::Float32),
            "float64" => Some(Dtype::Float64),
            "complex64" => Some(Dtype::Complex64),
            "complex128" => Some(Dtype::Complex128),
            _ => None,
        }
    }

    fn is_integer(self) -> bool {
        matches!(self, Dtype::Int16 | Dtype::Int32 | Dtype::Int64)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One dense chunk of a persisted payload.
#[derive(Debug, Clone)]
pub enum DataChunk {
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Complex64(ArrayD<Complex32>),
    Complex128(ArrayD<Complex64>),
}

impl DataChunk {
    pub fn dtype(&self) -> Dtype {
        match self {
            DataChunk::Int16(_) => Dtype::Int16,
            DataChunk::Int32(_) => Dtype::Int32,
            DataChunk::Int64(_) => Dtype::Int64,
            DataChunk::Float32(_) => Dtype::Float32,
            DataChunk::Float64(_) => Dtype::Float64,
            DataChunk::Complex64(_) => Dtype::Complex64,
            DataChunk::Complex128(_) => Dtype::Complex128,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            DataChunk::Int16(a) => a.shape(),
            DataChunk::Int32(a) => a.shape(),
            DataChunk::Int64(a) => a.shape(),
            DataChunk::Float32(a) => a.shape(),
            DataChunk::Float64(a) => a.shape(),
            DataChunk::Complex64(a) => a.shape(),
            DataChunk::Complex128(a) => a.shape(),
        }
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every element, widened to `target`, as little-endian bytes.
    ///
    /// `target` must be at least as wide as this chunk's dtype; narrowing is
    /// refused.
    pub(crate) fn write_widened(
        &self,
        target: Dtype,
        out: &mut impl Write,
    ) -> io::Result<()> {
        if target < self.dtype() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot narrow {} chunk to {}", self.dtype(), target),
            ));
        }
        if target.is_integer() {
            for value in self.iter_as_i64() {
                write_int(out, value, target)?;
            }
        } else {
            for value in self.iter_as_complex() {
                write_scalar(out, value, target)?;
            }
        }
        Ok(())
    }

    /// Elements as `i64`, valid only for integer chunks.
    fn iter_as_i64(&self) -> Box<dyn Iterator<Item = i64> + '_> {
        match self {
            DataChunk::Int16(a) => Box::new(a.iter().map(|&v| v as i64)),
            DataChunk::Int32(a) => Box::new(a.iter().map(|&v| v as i64)),
            DataChunk::Int64(a) => Box::new(a.iter().copied()),
            _ => Box::new(std::iter::empty()),
        }
    }

    fn iter_as_complex(&self) -> Box<dyn Iterator<Item = Complex64> + '_> {
        match self {
            DataChunk::Int16(a) => Box::new(a.iter().map(|&v| Complex64::new(v as f64, 0.0))),
            DataChunk::Int32(a) => Box::new(a.iter().map(|&v| Complex64::new(v as f64, 0.0))),
            DataChunk::Int64(a) => Box::new(a.iter().map(|&v| Complex64::new(v as f64, 0.0))),
            DataChunk::Float32(a) => {
                Box::new(a.iter().map(|&v| Complex64::new(v as f64, 0.0)))
            }
            DataChunk::Float64(a) => Box::new(a.iter().map(|&v| Complex64::new(v, 0.0))),
            DataChunk::Complex64(a) => Box::new(
                a.iter()
                    .map(|&v| Complex64::new(v.re as f64, v.im as f64)),
            ),
            DataChunk::Complex128(a) => Box::new(a.iter().copied()),
        }
    }
}

fn write_int(out: &mut impl Write, value: i64, target: Dtype) -> io::Result<()> {
    match target {
        Dtype::Int16 => out.write_all(&(value as i16).to_le_bytes()),
        Dtype::Int32 => out.write_all(&(value as i32).to_le_bytes()),
        Dtype::Int64 => out.write_all(&value.to_le_bytes()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "non-integer target for integer write",
        )),
    }
}

fn write_scalar(out: &mut impl Write, value: Complex64, target: Dtype) -> io::Result<()> {
    match target {
        Dtype::Float32 => out.write_all(&(value.re as f32).to_le_bytes()),
        Dtype::Float64 => out.write_all(&value.re.to_le_bytes()),
        Dtype::Complex64 => {
            out.write_all(&(value.re as f32).to_le_bytes())?;
            out.write_all(&(value.im as f32).to_le_bytes())
        }
        Dtype::Complex128 => {
            out.write_all(&value.re.to_le_bytes())?;
            out.write_all(&value.im.to_le_bytes())
        }
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "integer target for scalar write",
        )),
    }
}

/// Widest dtype across a chunk collection; `None` when empty.
pub fn widest_dtype(chunks: &[DataChunk]) -> Option<Dtype> {
    chunks.iter().map(DataChunk::dtype).max()
}
