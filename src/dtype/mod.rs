//! Data type system for graphalg containers and kernels
//!
//! This module provides the `DType` enum representing all supported element types,
//! the coercion order used for kernel resolution, and the dynamically typed
//! [`Value`] used for scalars, identities and operator parameters.

pub mod complex;
mod promotion;
mod value;

pub use complex::Complex128;
pub use promotion::{can_cast_safely, coercion_target, promote};
pub use value::Value;

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DType Enum
// ============================================================================

/// Element types supported by the compute engine
///
/// A dtype is only ever used as a key: kernels are looked up by dtype, and
/// values are cast to the dtype of the kernel that consumes them.
///
/// # Discriminant Values
///
/// Discriminants follow the coercion order, so `a as u8 < b as u8` means `a`
/// sits below `b` in the promotion chain:
/// `Bool < I8 < U8 < I16 < U16 < I32 < U32 < I64 < U64 < F32 < F64 < Complex64 < Complex128`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DType {
    /// Boolean type
    Bool = 0,
    /// 8-bit signed integer
    I8 = 1,
    /// 8-bit unsigned integer
    U8 = 2,
    /// 16-bit signed integer
    I16 = 3,
    /// 16-bit unsigned integer
    U16 = 4,
    /// 32-bit signed integer
    I32 = 5,
    /// 32-bit unsigned integer
    U32 = 6,
    /// 64-bit signed integer
    I64 = 7,
    /// 64-bit unsigned integer
    U64 = 8,
    /// 32-bit floating point
    F32 = 9,
    /// 64-bit floating point
    F64 = 10,
    /// 64-bit complex (two f32: re, im)
    Complex64 = 11,
    /// 128-bit complex (two f64: re, im)
    Complex128 = 12,
}

impl DType {
    /// Every dtype in coercion order
    pub const ALL: [DType; 13] = [
        DType::Bool,
        DType::I8,
        DType::U8,
        DType::I16,
        DType::U16,
        DType::I32,
        DType::U32,
        DType::I64,
        DType::U64,
        DType::F32,
        DType::F64,
        DType::Complex64,
        DType::Complex128,
    ];

    /// Returns true if this is a floating point type
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F64 | Self::F32)
    }

    /// Returns true if this is a complex number type
    #[inline]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    /// Returns true if this is a signed integer type
    #[inline]
    pub const fn is_signed_int(self) -> bool {
        matches!(self, Self::I64 | Self::I32 | Self::I16 | Self::I8)
    }

    /// Returns true if this is an unsigned integer type
    #[inline]
    pub const fn is_unsigned_int(self) -> bool {
        matches!(self, Self::U64 | Self::U32 | Self::U16 | Self::U8)
    }

    /// Returns true if this is any integer type (signed or unsigned)
    #[inline]
    pub const fn is_int(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    /// Returns true if this is a boolean type
    #[inline]
    pub const fn is_bool(self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Returns true if this type can represent negative values
    #[inline]
    pub const fn is_signed(self) -> bool {
        self.is_float() || self.is_signed_int() || self.is_complex()
    }

    /// Position in the coercion order
    #[inline]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Canonical upper-case name (e.g. "INT64", "FP32")
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::I8 => "INT8",
            Self::U8 => "UINT8",
            Self::I16 => "INT16",
            Self::U16 => "UINT16",
            Self::I32 => "INT32",
            Self::U32 => "UINT32",
            Self::I64 => "INT64",
            Self::U64 => "UINT64",
            Self::F32 => "FP32",
            Self::F64 => "FP64",
            Self::Complex64 => "FC32",
            Self::Complex128 => "FC64",
        }
    }

    /// Short name for display (e.g., "f32", "i64")
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::I64 => "i64",
            Self::I32 => "i32",
            Self::I16 => "i16",
            Self::I8 => "i8",
            Self::U64 => "u64",
            Self::U32 => "u32",
            Self::U16 => "u16",
            Self::U8 => "u8",
            Self::Bool => "bool",
            Self::Complex64 => "c64",
            Self::Complex128 => "c128",
        }
    }

    /// Lowest value of this dtype as a [`Value`] (identity of `max`)
    pub fn lowest(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::I8 => Value::Int(i8::MIN as i64),
            Self::I16 => Value::Int(i16::MIN as i64),
            Self::I32 => Value::Int(i32::MIN as i64),
            Self::I64 => Value::Int(i64::MIN),
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => Value::UInt(0),
            Self::F32 | Self::F64 | Self::Complex64 | Self::Complex128 => {
                Value::Float(f64::NEG_INFINITY)
            }
        }
    }

    /// Highest value of this dtype as a [`Value`] (identity of `min`)
    pub fn highest(self) -> Value {
        match self {
            Self::Bool => Value::Bool(true),
            Self::I8 => Value::Int(i8::MAX as i64),
            Self::I16 => Value::Int(i16::MAX as i64),
            Self::I32 => Value::Int(i32::MAX as i64),
            Self::I64 => Value::Int(i64::MAX),
            Self::U8 => Value::UInt(u8::MAX as u64),
            Self::U16 => Value::UInt(u16::MAX as u64),
            Self::U32 => Value::UInt(u32::MAX as u64),
            Self::U64 => Value::UInt(u64::MAX),
            Self::F32 | Self::F64 | Self::Complex64 | Self::Complex128 => {
                Value::Float(f64::INFINITY)
            }
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    /// Parse a dtype name, case-insensitively.
    ///
    /// Accepts canonical names (`"INT64"`), short names (`"i64"`), and the
    /// generic aliases `int`, `uint`, `float`, `complex`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let dtype = match lower.as_str() {
            "bool" | "boolean" => Self::Bool,
            "int8" | "i8" => Self::I8,
            "uint8" | "u8" => Self::U8,
            "int16" | "i16" => Self::I16,
            "uint16" | "u16" => Self::U16,
            "int32" | "i32" => Self::I32,
            "uint32" | "u32" => Self::U32,
            "int64" | "i64" | "int" => Self::I64,
            "uint64" | "u64" | "uint" => Self::U64,
            "fp32" | "f32" | "float32" => Self::F32,
            "fp64" | "f64" | "float64" | "float" => Self::F64,
            "fc32" | "c64" | "complex64" => Self::Complex64,
            "fc64" | "c128" | "complex128" | "complex" => Self::Complex128,
            _ => return Err(Error::invalid_value(format!("Unknown dtype: {s:?}"))),
        };
        Ok(dtype)
    }
}

/// Set of dtypes for efficient membership testing
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DTypeSet {
    bits: u16,
}

impl DTypeSet {
    /// Empty set
    pub const EMPTY: Self = Self { bits: 0 };

    /// Boolean only
    pub const BOOL: Self = Self::single(DType::Bool);

    /// All floating point types
    pub const FLOATS: Self = Self {
        bits: (1 << DType::F64 as u8) | (1 << DType::F32 as u8),
    };

    /// All signed integer types
    pub const SIGNED_INTS: Self = Self {
        bits: (1 << DType::I64 as u8)
            | (1 << DType::I32 as u8)
            | (1 << DType::I16 as u8)
            | (1 << DType::I8 as u8),
    };

    /// All unsigned integer types
    pub const UNSIGNED_INTS: Self = Self {
        bits: (1 << DType::U64 as u8)
            | (1 << DType::U32 as u8)
            | (1 << DType::U16 as u8)
            | (1 << DType::U8 as u8),
    };

    /// All integer types
    pub const INTS: Self = Self {
        bits: Self::SIGNED_INTS.bits | Self::UNSIGNED_INTS.bits,
    };

    /// All real numeric types (floats + ints), excluding bool
    pub const NUMERIC: Self = Self {
        bits: Self::FLOATS.bits | Self::INTS.bits,
    };

    /// All complex types
    pub const COMPLEX: Self = Self {
        bits: (1 << DType::Complex64 as u8) | (1 << DType::Complex128 as u8),
    };

    /// Every dtype
    pub const ALL: Self = Self {
        bits: Self::NUMERIC.bits | Self::COMPLEX.bits | Self::BOOL.bits,
    };

    /// Create a set containing a single dtype
    #[inline]
    pub const fn single(dtype: DType) -> Self {
        Self {
            bits: 1 << dtype as u8,
        }
    }

    /// Check if the set contains a dtype
    #[inline]
    pub const fn contains(self, dtype: DType) -> bool {
        self.bits & (1 << dtype as u8) != 0
    }

    /// Union of two sets
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Intersection of two sets
    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Set difference
    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// Check if set is empty
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Members in coercion order
    pub fn iter(self) -> impl Iterator<Item = DType> {
        DType::ALL.into_iter().filter(move |dt| self.contains(*dt))
    }
}

impl FromIterator<DType> for DTypeSet {
    fn from_iter<I: IntoIterator<Item = DType>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::EMPTY, |set, dt| set.union(Self::single(dt)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_categories() {
        assert!(DType::F32.is_float());
        assert!(!DType::I32.is_float());
        assert!(DType::I32.is_signed_int());
        assert!(DType::U32.is_unsigned_int());
        assert!(!DType::U32.is_signed());
        assert!(DType::Complex64.is_signed());
    }

    #[test]
    fn test_rank_follows_coercion_order() {
        for pair in DType::ALL.windows(2) {
            assert!(pair[0].rank() < pair[1].rank(), "{:?}", pair);
        }
    }

    #[test]
    fn test_dtype_set() {
        assert!(DTypeSet::FLOATS.contains(DType::F32));
        assert!(!DTypeSet::FLOATS.contains(DType::I32));
        assert!(DTypeSet::INTS.contains(DType::I32));
        assert!(DTypeSet::NUMERIC.contains(DType::F32));
        assert!(!DTypeSet::NUMERIC.contains(DType::Bool));
        assert!(DTypeSet::ALL.contains(DType::Complex128));
        let set: DTypeSet = [DType::I64, DType::Bool].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![DType::Bool, DType::I64]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("INT64".parse::<DType>().unwrap(), DType::I64);
        assert_eq!("int".parse::<DType>().unwrap(), DType::I64);
        assert_eq!("float".parse::<DType>().unwrap(), DType::F64);
        assert_eq!("fc32".parse::<DType>().unwrap(), DType::Complex64);
        assert!("int128".parse::<DType>().is_err());
    }

    #[test]
    fn test_identity_bounds() {
        assert_eq!(DType::I8.highest(), Value::Int(127));
        assert_eq!(DType::U16.lowest(), Value::UInt(0));
        assert_eq!(DType::F64.lowest(), Value::Float(f64::NEG_INFINITY));
    }
}
