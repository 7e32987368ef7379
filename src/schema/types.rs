//! Atom types and the scalar/array type-spec distinction.
//!
//! Every value that crosses the wire is built from an [`AtomType`]: a
//! fixed-width little-endian scalar.  Arrays are variable-length runs of
//! one atom type whose length is only known at call time.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Fixed-width scalar kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
}

impl AtomType {
    /// All atom types, in catalog order.
    pub const ALL: [AtomType; 10] = [
        Self::Bool,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Float32,
    ];

    /// Width of one encoded value in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 => 8,
        }
    }

    /// Catalog name, as used in interface descriptions.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
        }
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of an argument or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeSpec {
    Scalar(AtomType),
    Array(AtomType),
}

impl TypeSpec {
    pub const fn atom(self) -> AtomType {
        match self {
            Self::Scalar(a) | Self::Array(a) => a,
        }
    }

    pub const fn is_array(self) -> bool {
        matches!(self, Self::Array(_))
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(a) => write!(f, "{a}"),
            Self::Array(a) => write!(f, "{a}[]"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar values
// ---------------------------------------------------------------------------

/// A decoded scalar value, tagged with its atom type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
}

impl Scalar {
    pub const fn atom(&self) -> AtomType {
        match self {
            Self::Bool(_) => AtomType::Bool,
            Self::Int8(_) => AtomType::Int8,
            Self::Int16(_) => AtomType::Int16,
            Self::Int32(_) => AtomType::Int32,
            Self::Int64(_) => AtomType::Int64,
            Self::Uint8(_) => AtomType::Uint8,
            Self::Uint16(_) => AtomType::Uint16,
            Self::Uint32(_) => AtomType::Uint32,
            Self::Uint64(_) => AtomType::Uint64,
            Self::Float32(_) => AtomType::Float32,
        }
    }

    /// Write the little-endian encoding into `out`, which must be exactly
    /// `self.atom().width()` bytes long.
    pub fn write_le(&self, out: &mut [u8]) {
        match *self {
            Self::Bool(v) => out.copy_from_slice(&[u8::from(v)]),
            Self::Int8(v) => out.copy_from_slice(&v.to_le_bytes()),
            Self::Int16(v) => out.copy_from_slice(&v.to_le_bytes()),
            Self::Int32(v) => out.copy_from_slice(&v.to_le_bytes()),
            Self::Int64(v) => out.copy_from_slice(&v.to_le_bytes()),
            Self::Uint8(v) => out.copy_from_slice(&[v]),
            Self::Uint16(v) => out.copy_from_slice(&v.to_le_bytes()),
            Self::Uint32(v) => out.copy_from_slice(&v.to_le_bytes()),
            Self::Uint64(v) => out.copy_from_slice(&v.to_le_bytes()),
            Self::Float32(v) => out.copy_from_slice(&v.to_le_bytes()),
        }
    }

    /// Decode one value of `atom` from the front of `bytes`.
    ///
    /// Returns `None` if fewer than `atom.width()` bytes are available.
    pub fn read_le(atom: AtomType, bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..atom.width())?;
        Some(match atom {
            AtomType::Bool => Self::Bool(b[0] != 0),
            AtomType::Int8 => Self::Int8(i8::from_le_bytes([b[0]])),
            AtomType::Int16 => Self::Int16(i16::from_le_bytes(b.try_into().ok()?)),
            AtomType::Int32 => Self::Int32(i32::from_le_bytes(b.try_into().ok()?)),
            AtomType::Int64 => Self::Int64(i64::from_le_bytes(b.try_into().ok()?)),
            AtomType::Uint8 => Self::Uint8(b[0]),
            AtomType::Uint16 => Self::Uint16(u16::from_le_bytes(b.try_into().ok()?)),
            AtomType::Uint32 => Self::Uint32(u32::from_le_bytes(b.try_into().ok()?)),
            AtomType::Uint64 => Self::Uint64(u64::from_le_bytes(b.try_into().ok()?)),
            AtomType::Float32 => Self::Float32(f32::from_le_bytes(b.try_into().ok()?)),
        })
    }

    /// Typed extraction; `None` if the atom type differs.
    pub fn get<T: Atom>(&self) -> Option<T> {
        T::from_scalar(*self)
    }
}

// ---------------------------------------------------------------------------
// Rust <-> atom mapping
// ---------------------------------------------------------------------------

/// Rust scalar types that map one-to-one onto an [`AtomType`].
pub trait Atom: Copy {
    const ATOM: AtomType;

    fn into_scalar(self) -> Scalar;

    fn from_scalar(s: Scalar) -> Option<Self>;
}

macro_rules! impl_atom {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Atom for $ty {
                const ATOM: AtomType = AtomType::$variant;

                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                fn from_scalar(s: Scalar) -> Option<Self> {
                    match s {
                        Scalar::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Scalar::$variant(v)
                }
            }
        )*
    };
}

impl_atom! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
}
