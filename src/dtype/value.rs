//! Dynamically typed scalar values

use super::{Complex128, DType};
use crate::error::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single scalar value
///
/// Values are stored in the widest representation of their family and cast
/// to a concrete [`DType`] with [`Value::cast`] when they cross into a kernel.
/// Equality and hashing are bitwise for floats so values can be used as
/// memoization keys (e.g. operator parameters).
#[derive(Copy, Clone, Debug)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Real floating point
    Float(f64),
    /// Complex
    Complex(Complex128),
}

impl Value {
    /// Natural dtype of a literal of this family
    pub fn dtype_hint(&self) -> DType {
        match self {
            Self::Bool(_) => DType::Bool,
            Self::Int(_) => DType::I64,
            Self::UInt(_) => DType::U64,
            Self::Float(_) => DType::F64,
            Self::Complex(_) => DType::Complex128,
        }
    }

    /// Zero of a dtype
    pub fn zero(dtype: DType) -> Self {
        Value::Bool(false).cast(dtype)
    }

    /// One of a dtype
    pub fn one(dtype: DType) -> Self {
        Value::Bool(true).cast(dtype)
    }

    /// Cast into the representation of `dtype`
    ///
    /// Integer narrowing wraps, float-to-int truncates toward zero (saturating),
    /// complex-to-real drops the imaginary part.
    pub fn cast(self, dtype: DType) -> Self {
        match dtype {
            DType::Bool => Self::Bool(self.truthy()),
            DType::I8 => Self::Int(self.as_i64_wrapping() as i8 as i64),
            DType::I16 => Self::Int(self.as_i64_wrapping() as i16 as i64),
            DType::I32 => Self::Int(self.as_i64_wrapping() as i32 as i64),
            DType::I64 => Self::Int(self.as_i64_wrapping()),
            DType::U8 => Self::UInt(self.as_u64_wrapping() as u8 as u64),
            DType::U16 => Self::UInt(self.as_u64_wrapping() as u16 as u64),
            DType::U32 => Self::UInt(self.as_u64_wrapping() as u32 as u64),
            DType::U64 => Self::UInt(self.as_u64_wrapping()),
            DType::F32 => Self::Float(self.to_f64() as f32 as f64),
            DType::F64 => Self::Float(self.to_f64()),
            DType::Complex64 => Self::Complex(self.to_complex().round_to_c64()),
            DType::Complex128 => Self::Complex(self.to_complex()),
        }
    }

    /// Truthiness: nonzero is true
    pub fn truthy(&self) -> bool {
        match *self {
            Self::Bool(b) => b,
            Self::Int(i) => i != 0,
            Self::UInt(u) => u != 0,
            Self::Float(f) => f != 0.0,
            Self::Complex(c) => c != Complex128::ZERO,
        }
    }

    /// Real part as f64
    pub fn to_f64(&self) -> f64 {
        match *self {
            Self::Bool(b) => b as u8 as f64,
            Self::Int(i) => i as f64,
            Self::UInt(u) => u as f64,
            Self::Float(f) => f,
            Self::Complex(c) => c.re,
        }
    }

    /// As a complex number
    pub fn to_complex(&self) -> Complex128 {
        match *self {
            Self::Complex(c) => c,
            other => Complex128::from(other.to_f64()),
        }
    }

    fn as_i64_wrapping(&self) -> i64 {
        match *self {
            Self::Bool(b) => b as i64,
            Self::Int(i) => i,
            Self::UInt(u) => u as i64,
            Self::Float(f) => f as i64,
            Self::Complex(c) => c.re as i64,
        }
    }

    fn as_u64_wrapping(&self) -> u64 {
        match *self {
            Self::Bool(b) => b as u64,
            Self::Int(i) => i as u64,
            Self::UInt(u) => u,
            Self::Float(f) => f as u64,
            Self::Complex(c) => c.re as u64,
        }
    }

    /// Exact conversion to i64, failing on fractional or out-of-range values
    pub fn try_to_i64(&self) -> Result<i64> {
        match *self {
            Self::Bool(b) => Ok(b as i64),
            Self::Int(i) => Ok(i),
            Self::UInt(u) => i64::try_from(u)
                .map_err(|_| Error::invalid_value(format!("{u} does not fit in INT64"))),
            Self::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(f as i64)
            }
            Self::Complex(c) if c.is_real() => Self::Float(c.re).try_to_i64(),
            other => Err(Error::invalid_value(format!(
                "{other} cannot be converted to an integer exactly"
            ))),
        }
    }

    /// Whether the value belongs to the domain of `dtype`
    ///
    /// Integers and booleans must round-trip exactly; any real value fits a
    /// float dtype (rounding is allowed), and anything fits a complex dtype.
    pub fn fits(&self, dtype: DType) -> bool {
        match (*self, dtype) {
            (_, dt) if dt.is_complex() => true,
            (Self::Complex(_), _) => false,
            (_, DType::F32 | DType::F64) => true,
            (v, dt) => v.cast(dt).cast(v.dtype_hint()) == v,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Complex(a), Self::Complex(b)) => {
                a.re.to_bits() == b.re.to_bits() && a.im.to_bits() == b.im.to_bits()
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match *self {
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::UInt(u) => u.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Complex(c) => {
                c.re.to_bits().hash(state);
                c.im.to_bits().hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Complex(c) => write!(f, "{c}"),
        }
    }
}

macro_rules! impl_from_value {
    ($($t:ty => $variant:ident as $repr:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                #[inline]
                fn from(v: $t) -> Self {
                    Value::$variant(v as $repr)
                }
            }
        )*
    };
}

impl_from_value!(
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f64,
    f64 => Float as f64,
);

impl From<bool> for Value {
    #[inline]
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Complex128> for Value {
    #[inline]
    fn from(v: Complex128) -> Self {
        Value::Complex(v)
    }
}
