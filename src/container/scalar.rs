//! Sparse scalar: a single value that may be missing

use super::{next_name, Shape, Sparse};
use crate::dtype::{DType, Value};
use crate::ops::Position;

/// A typed value that may be empty
#[derive(Clone, Debug, PartialEq)]
pub struct Scalar {
    name: String,
    data: Sparse,
}

super::container_common!(Scalar);

impl Scalar {
    /// Empty scalar of `dtype`
    pub fn new(dtype: DType) -> Self {
        Self::from_parts(next_name(Shape::Scalar), Sparse::new(dtype, Shape::Scalar))
    }

    /// Scalar holding `value` at its natural dtype
    pub fn from_value(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::with_dtype(value, value.dtype_hint())
    }

    /// Scalar holding `value` cast to `dtype`
    pub fn with_dtype(value: impl Into<Value>, dtype: DType) -> Self {
        Self::from_parts(next_name(Shape::Scalar), Sparse::scalar(dtype, value.into()))
    }

    pub(crate) fn from_parts(name: String, data: Sparse) -> Self {
        Self { name, data }
    }

    /// The value, or `None` if empty
    pub fn value(&self) -> Option<Value> {
        self.data.get(Position::default())
    }

    /// Store `value`, cast to the scalar's dtype
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.data.put(Position::default(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_roundtrip_and_cast() {
        let mut s = Scalar::new(DType::I8);
        assert!(s.is_empty());
        s.set_value(200i64);
        assert_eq!(s.value(), Some(Value::Int(-56)));
        assert_eq!(s.nvals(), 1);
        s.clear();
        assert_eq!(s.value(), None);
    }

    #[test]
    fn test_names_are_unique() {
        let a = Scalar::from_value(1i64);
        let b = Scalar::from_value(1i64);
        assert_ne!(a.name(), b.name());
        assert!(a.isequal(&b));
        assert_eq!(a.dtype(), DType::I64);
    }
}
