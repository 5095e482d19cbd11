//! Arguments captured by an expression

use crate::container::{Collection, Operand, Shape, Sparse};
use crate::dtype::{DType, Value};
use crate::error::{Error, Result};
use std::borrow::Cow;

/// One input of an operation: borrowed container storage, or an owned literal
#[derive(Clone, Debug)]
pub(crate) struct Arg<'a> {
    data: Cow<'a, Sparse>,
    transposed: bool,
}

impl<'a> Arg<'a> {
    pub(crate) fn owned(data: Sparse) -> Self {
        Self {
            data: Cow::Owned(data),
            transposed: false,
        }
    }

    pub(crate) fn borrowed(data: &'a Sparse, transposed: bool) -> Self {
        Self {
            data: Cow::Borrowed(data),
            transposed,
        }
    }

    /// Capture an operand; expressions must be computed (or computable) under `attr`
    pub(crate) fn from_operand(operand: Operand<'a>, attr: &str) -> Result<Self> {
        Self::with_hint(operand, None, attr)
    }

    /// Like [`Arg::from_operand`]; a literal takes `hint` as its dtype when it fits
    pub(crate) fn with_hint(operand: Operand<'a>, hint: Option<DType>, attr: &str) -> Result<Self> {
        Ok(match operand {
            Operand::Literal(v) => Self::owned(Sparse::scalar(literal_dtype(v, hint), v)),
            Operand::Scalar(s) => Self::borrowed(s.data(), false),
            Operand::Vector(v) => Self::borrowed(v.data(), false),
            Operand::Matrix(m) => Self::borrowed(m.data(), false),
            Operand::Transposed(m) => Self::borrowed(m.data(), true),
            Operand::Expr(e) => Self::borrowed(Collection::data(e.gate(attr)?), false),
        })
    }

    pub(crate) fn data(&self) -> &Sparse {
        &self.data
    }

    pub(crate) fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub(crate) fn transposed(&self) -> bool {
        self.transposed
    }

    /// Shape as seen by the operation
    pub(crate) fn shape(&self) -> Shape {
        let shape = self.data.shape();
        if self.transposed {
            shape.transposed()
        } else {
            shape
        }
    }

    /// Single value of a scalar argument, for binding into `apply`
    pub(crate) fn bound_value(&self, attr: &str) -> Result<Value> {
        if self.shape() != Shape::Scalar {
            return Err(Error::invalid_type(format!(
                "{attr} can only bind a scalar, got a {}",
                self.shape().type_name()
            )));
        }
        self.data
            .get(Default::default())
            .ok_or_else(|| Error::invalid_value(format!("{attr} cannot bind an empty Scalar")))
    }
}

/// Dtype a literal takes next to an operand of dtype `other`
///
/// The literal adopts `other` when its value fits without changing family
/// (booleans stay booleans, floats never become integers); otherwise it keeps
/// its natural dtype.
pub(crate) fn literal_dtype(value: Value, other: Option<DType>) -> DType {
    let hint = value.dtype_hint();
    match other {
        Some(dt) if dt == hint => dt,
        Some(dt)
            if hint != DType::Bool
                && dt != DType::Bool
                && !(hint.is_float() && dt.is_int())
                && value.fits(dt) =>
        {
            dt
        }
        _ => hint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_dtype() {
        assert_eq!(literal_dtype(Value::Int(3), Some(DType::F32)), DType::F32);
        assert_eq!(literal_dtype(Value::Int(3), Some(DType::U8)), DType::U8);
        assert_eq!(literal_dtype(Value::Int(300), Some(DType::U8)), DType::I64);
        assert_eq!(literal_dtype(Value::Float(2.0), Some(DType::I32)), DType::F64);
        assert_eq!(literal_dtype(Value::Int(1), Some(DType::Bool)), DType::I64);
        assert_eq!(literal_dtype(Value::Bool(true), Some(DType::Bool)), DType::Bool);
        assert_eq!(literal_dtype(Value::Float(0.5), None), DType::F64);
    }

    #[test]
    fn test_bound_value() {
        let arg = Arg::owned(Sparse::scalar(DType::I64, Value::Int(4)));
        assert_eq!(arg.bound_value("apply").unwrap(), Value::Int(4));
        let empty = Arg::owned(Sparse::new(DType::I64, Shape::Scalar));
        assert!(empty.bound_value("apply").unwrap_err().is_value_error());
        let vec = Arg::owned(Sparse::new(DType::I64, Shape::Vector(2)));
        assert!(vec.bound_value("apply").unwrap_err().is_type_error());
    }
}
