//! Sparse storage shared by every container

use super::Shape;
use crate::dtype::{promote, DType, Value};
use crate::error::{Error, Result};
use crate::ops::Position;
use std::collections::BTreeMap;

/// Typed sparse entries of a fixed shape
///
/// This is what the compute engine reads and writes. Values are always
/// stored cast to `dtype`; positions are ordered row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Sparse {
    dtype: DType,
    shape: Shape,
    entries: BTreeMap<Position, Value>,
}

impl Sparse {
    /// Empty storage
    pub fn new(dtype: DType, shape: Shape) -> Self {
        Self {
            dtype,
            shape,
            entries: BTreeMap::new(),
        }
    }

    /// One-entry scalar storage
    pub fn scalar(dtype: DType, value: Value) -> Self {
        let mut s = Self::new(dtype, Shape::Scalar);
        s.entries.insert(Position::default(), value.cast(dtype));
        s
    }

    /// Element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Shape
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of stored entries
    #[inline]
    pub fn nvals(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value at `pos`, if stored
    #[inline]
    pub fn get(&self, pos: Position) -> Option<Value> {
        self.entries.get(&pos).copied()
    }

    /// Stored entries in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Position, Value)> + '_ {
        self.entries.iter().map(|(p, v)| (*p, *v))
    }

    /// Store `value` at `pos`, casting it to the storage dtype
    pub fn insert(&mut self, pos: Position, value: Value) -> Result<()> {
        if !self.shape.contains(pos) {
            let (index, size) = match self.shape {
                Shape::Matrix(r, _) if pos.row >= r => (pos.row, r),
                Shape::Matrix(_, c) => (pos.col, c),
                Shape::Vector(n) => (pos.row, n),
                Shape::Scalar => (pos.row, 1),
            };
            return Err(Error::IndexOutOfBounds { index, size });
        }
        self.put(pos, value);
        Ok(())
    }

    /// Store without a bounds check; the engine only produces in-bounds positions
    #[inline]
    pub(crate) fn put(&mut self, pos: Position, value: Value) {
        self.entries.insert(pos, value.cast(self.dtype));
    }

    /// Remove and return the value at `pos`
    pub fn remove(&mut self, pos: Position) -> Option<Value> {
        self.entries.remove(&pos)
    }

    /// Drop every entry, keeping shape and dtype
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy with rows and columns swapped
    pub fn transposed(&self) -> Self {
        if !matches!(self.shape, Shape::Matrix(..)) {
            return self.clone();
        }
        Self {
            dtype: self.dtype,
            shape: self.shape.transposed(),
            entries: self
                .entries
                .iter()
                .map(|(p, v)| (Position::matrix(p.col, p.row), *v))
                .collect(),
        }
    }

    /// Copy with every value cast to `dtype`
    pub fn cast(&self, dtype: DType) -> Self {
        if dtype == self.dtype {
            return self.clone();
        }
        Self {
            dtype,
            shape: self.shape,
            entries: self.entries.iter().map(|(p, v)| (*p, v.cast(dtype))).collect(),
        }
    }

    /// Same shape, same pattern, and equal values
    ///
    /// Values of different dtypes are compared after promotion unless
    /// `check_dtype` is set, in which case differing dtypes are never equal.
    pub fn isequal(&self, other: &Sparse, check_dtype: bool) -> bool {
        self.compare(other, check_dtype, |a, b| a == b)
    }

    /// Like [`Sparse::isequal`], with floating point tolerance
    pub fn isclose(&self, other: &Sparse, rel_tol: f64, abs_tol: f64, check_dtype: bool) -> bool {
        self.compare(other, check_dtype, |a, b| values_close(a, b, rel_tol, abs_tol))
    }

    fn compare(&self, other: &Sparse, check_dtype: bool, eq: impl Fn(Value, Value) -> bool) -> bool {
        if self.shape != other.shape || self.nvals() != other.nvals() {
            return false;
        }
        if check_dtype && self.dtype != other.dtype {
            return false;
        }
        let common = promote(self.dtype, other.dtype);
        self.entries
            .iter()
            .zip(other.entries.iter())
            .all(|((pa, a), (pb, b))| pa == pb && eq(a.cast(common), b.cast(common)))
    }

    pub(crate) fn into_entries(self) -> BTreeMap<Position, Value> {
        self.entries
    }
}

/// `|a - b| <= max(rel_tol * max(|a|, |b|), abs_tol)`, exact matches included
fn values_close(a: Value, b: Value, rel_tol: f64, abs_tol: f64) -> bool {
    if a == b {
        return true;
    }
    let (x, y) = (a.to_complex(), b.to_complex());
    if x == y {
        return true;
    }
    let diff = (x - y).magnitude();
    diff <= (rel_tol * x.magnitude().max(y.magnitude())).max(abs_tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(dtype: DType, entries: &[(u64, i64)]) -> Sparse {
        let mut s = Sparse::new(dtype, Shape::Vector(4));
        for &(i, v) in entries {
            s.insert(Position::vector(i), Value::Int(v)).unwrap();
        }
        s
    }

    #[test]
    fn test_insert_casts_and_checks_bounds() {
        let mut s = Sparse::new(DType::U8, Shape::Vector(3));
        s.insert(Position::vector(1), Value::Int(300)).unwrap();
        assert_eq!(s.get(Position::vector(1)), Some(Value::UInt(44)));
        assert!(matches!(
            s.insert(Position::vector(3), Value::Int(1)),
            Err(Error::IndexOutOfBounds { index: 3, size: 3 })
        ));
    }

    #[test]
    fn test_isequal_promotes_unless_checked() {
        let a = vec_of(DType::I32, &[(0, 1), (2, 3)]);
        let b = vec_of(DType::I64, &[(0, 1), (2, 3)]);
        assert!(a.isequal(&b, false));
        assert!(!a.isequal(&b, true));
        let c = vec_of(DType::I64, &[(0, 1), (3, 3)]);
        assert!(!b.isequal(&c, false));
    }

    #[test]
    fn test_isclose() {
        let mut a = Sparse::new(DType::F64, Shape::Scalar);
        a.put(Position::default(), Value::Float(1.0));
        let mut b = a.clone();
        b.put(Position::default(), Value::Float(1.0 + 1e-9));
        assert!(a.isclose(&b, 1e-7, 0.0, true));
        assert!(!a.isequal(&b, true));
    }

    #[test]
    fn test_transposed_swaps_positions() {
        let mut m = Sparse::new(DType::I64, Shape::Matrix(2, 3));
        m.insert(Position::matrix(0, 2), Value::Int(5)).unwrap();
        let t = m.transposed();
        assert_eq!(t.shape(), Shape::Matrix(3, 2));
        assert_eq!(t.get(Position::matrix(2, 0)), Some(Value::Int(5)));
    }
}
