//! Sparse vector

use super::{next_name, Mask, Shape, Sparse};
use crate::dtype::{DType, Value};
use crate::error::{Error, Result};
use crate::ops::Position;

/// A typed sparse vector of fixed size
#[derive(Clone, Debug, PartialEq)]
pub struct Vector {
    name: String,
    data: Sparse,
}

super::container_common!(Vector);

impl Vector {
    /// Empty vector
    pub fn new(dtype: DType, size: u64) -> Self {
        Self::from_parts(next_name(Shape::Vector(size)), Sparse::new(dtype, Shape::Vector(size)))
    }

    /// Build from parallel index and value lists
    ///
    /// Duplicate indices are rejected.
    pub fn from_coo<I, V>(indices: I, values: V, dtype: DType, size: u64) -> Result<Self>
    where
        I: IntoIterator<Item = u64>,
        V: IntoIterator,
        V::Item: Into<Value>,
    {
        let indices: Vec<u64> = indices.into_iter().collect();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if indices.len() != values.len() {
            return Err(Error::invalid_value(format!(
                "indices and values must have the same length; got {} and {}",
                indices.len(),
                values.len()
            )));
        }
        let mut v = Self::new(dtype, size);
        for (i, x) in indices.into_iter().zip(values) {
            let pos = Position::vector(i);
            if v.data.get(pos).is_some() {
                return Err(Error::invalid_value(format!("duplicate index {i} in from_coo")));
            }
            v.data.insert(pos, x)?;
        }
        Ok(v)
    }

    pub(crate) fn from_parts(name: String, data: Sparse) -> Self {
        Self { name, data }
    }

    /// Number of positions
    pub fn size(&self) -> u64 {
        match self.data.shape() {
            Shape::Vector(n) => n,
            _ => 0,
        }
    }

    /// Value at `index`, if stored
    pub fn get(&self, index: u64) -> Option<Value> {
        self.data.get(Position::vector(index))
    }

    /// Store `value` at `index`
    pub fn set(&mut self, index: u64, value: impl Into<Value>) -> Result<()> {
        self.data.insert(Position::vector(index), value.into())
    }

    /// Remove the entry at `index`
    pub fn remove(&mut self, index: u64) -> Option<Value> {
        self.data.remove(Position::vector(index))
    }

    /// Indices and values of the stored entries
    pub fn to_coo(&self) -> (Vec<u64>, Vec<Value>) {
        self.data.iter().map(|(p, v)| (p.row, v)).unzip()
    }

    /// Structural mask: stored positions pass
    pub fn s(&self) -> Mask<'_> {
        Mask::new(&self.name, &self.data, true)
    }

    /// Value mask: stored positions with truthy values pass
    pub fn v(&self) -> Mask<'_> {
        Mask::new(&self.name, &self.data, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coo() {
        let v = Vector::from_coo([0, 3], [1.5f64, 2.0], DType::F32, 5).unwrap();
        assert_eq!(v.size(), 5);
        assert_eq!(v.get(3), Some(Value::Float(2.0)));
        assert_eq!(v.to_coo().0, vec![0, 3]);
        assert!(Vector::from_coo([0, 0], [1i64, 2], DType::I64, 5).is_err());
        assert!(Vector::from_coo([0], [1i64, 2], DType::I64, 5).is_err());
        assert!(matches!(
            Vector::from_coo([7], [1i64], DType::I64, 5),
            Err(Error::IndexOutOfBounds { index: 7, size: 5 })
        ));
    }

    #[test]
    fn test_set_remove() {
        let mut v = Vector::new(DType::Bool, 3);
        v.set(1, 5i64).unwrap();
        assert_eq!(v.get(1), Some(Value::Bool(true)));
        assert_eq!(v.remove(1), Some(Value::Bool(true)));
        assert!(v.is_empty());
    }
}
