// Copyright (c) 2025 TensorDB Contributors
// Licensed under the TensorDB License. See LICENSE file for details.

//! Tensor field metadata.
//!
//! A tensor field is described by a [`TensorDescriptor`]: an element
//! [`DType`] and a shape whose dimensions are either fixed or unbound.
//! The store keeps only this metadata; the column backing a tensor field
//! holds an opaque reference, never tensor bytes.
//!
//! # Shape Encoding
//!
//! Shapes are persisted in the catalog as a MessagePack array. Each item is
//! an integer for a fixed dimension and `nil` for an unbound one:
//!
//! ```text
//! shape (?, 2)   ->   0x92 0xc0 0x02
//!                     |    |    +-- fixint 2
//!                     |    +------- nil (unbound)
//!                     +------------ fixarray, 2 items
//! ```
//!
//! Decoding additionally accepts `-1` as an unbound dimension.
//!
//! # Examples
//!
//! ```rust
//! use tensordb::tensor::{decode_shape, encode_shape, DType, Dim, TensorDescriptor};
//!
//! let desc = TensorDescriptor::new(DType::Int32, vec![Dim::Unbound, Dim::Fixed(2)]).unwrap();
//! assert_eq!(desc.to_string(), "int32[?, 2]");
//!
//! let bytes = encode_shape(desc.shape()).unwrap();
//! assert_eq!(decode_shape(&bytes).unwrap(), desc.shape());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TensorDbError};

/// Shape item value that decodes as an unbound dimension.
pub const UNBOUND_SENTINEL: i64 = -1;

/// Element data type of a tensor field.
///
/// Covers the native numeric dtypes, named by their canonical lowercase
/// names (`"int32"`, `"float64"`, ...). The name is what the catalog stores.
///
/// The extended-precision types are named by their padded storage width, so
/// `long double` is `float128` on x86-64 and `float96` on 32-bit x86.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Boolean stored as one byte
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 16-bit floating point
    Float16,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Extended precision float padded to 96 bits
    Float96,
    /// Extended precision float padded to 128 bits
    Float128,
    /// Complex number of two 32-bit floats
    Complex64,
    /// Complex number of two 64-bit floats
    Complex128,
    /// Complex number of two 96-bit extended floats
    Complex192,
    /// Complex number of two 128-bit extended floats
    Complex256,
}

impl DType {
    /// Every supported dtype.
    pub const ALL: [DType; 18] = [
        DType::Bool,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::Float16,
        DType::Float32,
        DType::Float64,
        DType::Float96,
        DType::Float128,
        DType::Complex64,
        DType::Complex128,
        DType::Complex192,
        DType::Complex256,
    ];

    /// Returns the size in bytes of one element.
    pub fn size(&self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 | DType::Float16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 | DType::Complex64 => 8,
            DType::Float96 => 12,
            DType::Float128 | DType::Complex128 => 16,
            DType::Complex192 => 24,
            DType::Complex256 => 32,
        }
    }

    /// Returns the canonical type name.
    pub fn name(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Float96 => "float96",
            DType::Float128 => "float128",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
            DType::Complex192 => "complex192",
            DType::Complex256 => "complex256",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = TensorDbError;

    fn from_str(s: &str) -> Result<Self> {
        DType::ALL
            .iter()
            .copied()
            .find(|dtype| dtype.name() == s)
            .ok_or_else(|| TensorDbError::UnknownDtype(s.to_string()))
    }
}

/// One dimension of a tensor shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Dimension of known, positive size.
    Fixed(usize),
    /// Dimension whose size varies between values.
    Unbound,
}

impl Dim {
    /// Returns the size if the dimension is fixed.
    pub fn size(&self) -> Option<usize> {
        match self {
            Dim::Fixed(n) => Some(*n),
            Dim::Unbound => None,
        }
    }
}

impl From<Option<usize>> for Dim {
    fn from(value: Option<usize>) -> Self {
        match value {
            Some(n) => Dim::Fixed(n),
            None => Dim::Unbound,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{}", n),
            Dim::Unbound => f.write_str("?"),
        }
    }
}

/// Metadata describing a tensor-valued field.
///
/// # Examples
///
/// ```rust
/// use tensordb::tensor::{DType, Dim, TensorDescriptor};
///
/// let image = TensorDescriptor::new(DType::UInt8, vec![Dim::Fixed(28), Dim::Fixed(28)]).unwrap();
/// assert_eq!(image.rank(), 2);
/// assert_eq!(image.num_elements(), Some(784));
///
/// let batch = TensorDescriptor::new(DType::Float32, vec![Dim::Unbound, Dim::Fixed(768)]).unwrap();
/// assert!(!batch.is_fully_bound());
/// assert_eq!(batch.num_elements(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorDescriptor {
    dtype: DType,
    shape: Vec<Dim>,
}

impl TensorDescriptor {
    /// Creates a descriptor, rejecting zero-sized fixed dimensions.
    pub fn new(dtype: DType, shape: Vec<Dim>) -> Result<Self> {
        if let Some(pos) = shape.iter().position(|d| *d == Dim::Fixed(0)) {
            return Err(TensorDbError::InvalidShape(format!(
                "dimension {} has size 0",
                pos
            )));
        }
        Ok(Self { dtype, shape })
    }

    /// Creates a descriptor from optional dimension sizes, `None` meaning unbound.
    pub fn from_dims(dtype: DType, dims: &[Option<usize>]) -> Result<Self> {
        Self::new(dtype, dims.iter().map(|d| Dim::from(*d)).collect())
    }

    /// Element data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Tensor shape.
    pub fn shape(&self) -> &[Dim] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns `true` if no dimension is unbound.
    pub fn is_fully_bound(&self) -> bool {
        self.shape.iter().all(|d| matches!(d, Dim::Fixed(_)))
    }

    /// Total element count, available only for fully bound shapes.
    pub fn num_elements(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, d| d.size().and_then(|n| acc.checked_mul(n)))
    }

    /// Encodes the shape for the catalog.
    pub fn encode_shape(&self) -> Result<Vec<u8>> {
        encode_shape(&self.shape)
    }

    /// Rebuilds a descriptor from catalog columns.
    pub fn decode(dtype: &str, shape: &[u8]) -> Result<Self> {
        let dtype = dtype.parse::<DType>()?;
        Self::new(dtype, decode_shape(shape)?)
    }
}

impl fmt::Display for TensorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.dtype)?;
        for (i, dim) in self.shape.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", dim)?;
        }
        f.write_str("]")
    }
}

/// Encodes a shape as a MessagePack array of integers and `nil`s.
pub fn encode_shape(shape: &[Dim]) -> Result<Vec<u8>> {
    let items = shape
        .iter()
        .map(|dim| match dim {
            Dim::Fixed(n) => i64::try_from(*n)
                .map(Some)
                .map_err(|_| TensorDbError::InvalidShape(format!("dimension {} overflows i64", n))),
            Dim::Unbound => Ok(None),
        })
        .collect::<Result<Vec<Option<i64>>>>()?;

    rmp_serde::to_vec(&items).map_err(|e| TensorDbError::InvalidShape(e.to_string()))
}

/// Decodes a shape written by [`encode_shape`].
///
/// Both `nil` and [`UNBOUND_SENTINEL`] decode as [`Dim::Unbound`]. Zero and
/// other negative sizes are rejected.
pub fn decode_shape(bytes: &[u8]) -> Result<Vec<Dim>> {
    let items: Vec<Option<i64>> =
        rmp_serde::from_slice(bytes).map_err(|e| TensorDbError::InvalidShape(e.to_string()))?;

    items
        .into_iter()
        .map(|item| match item {
            None | Some(UNBOUND_SENTINEL) => Ok(Dim::Unbound),
            Some(n) if n > 0 => usize::try_from(n)
                .map(Dim::Fixed)
                .map_err(|_| TensorDbError::InvalidShape(format!("dimension {} overflows usize", n))),
            Some(n) => Err(TensorDbError::InvalidShape(format!(
                "dimension size {} is not positive",
                n
            ))),
        })
        .collect()
}
