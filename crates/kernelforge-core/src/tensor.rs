use std::fmt;

use smallvec::SmallVec;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

/// Element type of an engine I/O tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Float32,
    Float16,
    Int8,
    Int32,
    Bool,
    Uint8,
    Fp8,
    Bf16,
    Int64,
    Int4,
    /// Anything the runtime exposes that is not in the table above.
    Unknown,
}

impl DataType {
    pub const KNOWN: [DataType; 10] = [
        DataType::Float32,
        DataType::Float16,
        DataType::Int8,
        DataType::Int32,
        DataType::Bool,
        DataType::Uint8,
        DataType::Fp8,
        DataType::Bf16,
        DataType::Int64,
        DataType::Int4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Float32 => "FLOAT32",
            DataType::Float16 => "FLOAT16",
            DataType::Int8 => "INT8",
            DataType::Int32 => "INT32",
            DataType::Bool => "BOOL",
            DataType::Uint8 => "UINT8",
            DataType::Fp8 => "FLOAT8",
            DataType::Bf16 => "BRAINFLOAT16",
            DataType::Int64 => "INT64",
            DataType::Int4 => "INT4",
            DataType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TensorIOMode {
    None,
    Input,
    Output,
}

impl fmt::Display for TensorIOMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TensorIOMode::None => "None",
            TensorIOMode::Input => "Input",
            TensorIOMode::Output => "Output",
        })
    }
}

/// Tensor dimensions; [`Dims::DYNAMIC`] marks an axis whose extent is not fixed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dims(pub SmallVec<[i64; 8]>);

impl Dims {
    pub const DYNAMIC: i64 = -1;

    pub fn from_slice(d: &[i64]) -> Self {
        Self(d.iter().copied().collect())
    }

    pub fn nchw(n: i64, c: i64, h: i64, w: i64) -> Self {
        Self::from_slice(&[n, c, h, w])
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn is_dynamic(&self) -> bool {
        self.0.iter().any(|d| *d < 0)
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("x")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}
