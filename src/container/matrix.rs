//! Sparse matrix and its transposed view

use super::{next_name, AlgebraicOperand, Mask, Operand, Shape, Sparse};
use crate::dtype::{DType, Value};
use crate::error::{Error, Result};
use crate::ops::Position;

/// A typed sparse matrix of fixed shape
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    name: String,
    data: Sparse,
}

super::container_common!(Matrix);

impl Matrix {
    /// Empty matrix
    pub fn new(dtype: DType, nrows: u64, ncols: u64) -> Self {
        let shape = Shape::Matrix(nrows, ncols);
        Self::from_parts(next_name(shape), Sparse::new(dtype, shape))
    }

    /// Build from parallel row, column, and value lists
    ///
    /// Duplicate positions are rejected.
    pub fn from_coo<R, C, V>(
        rows: R,
        cols: C,
        values: V,
        dtype: DType,
        nrows: u64,
        ncols: u64,
    ) -> Result<Self>
    where
        R: IntoIterator<Item = u64>,
        C: IntoIterator<Item = u64>,
        V: IntoIterator,
        V::Item: Into<Value>,
    {
        let rows: Vec<u64> = rows.into_iter().collect();
        let cols: Vec<u64> = cols.into_iter().collect();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if rows.len() != cols.len() || rows.len() != values.len() {
            return Err(Error::invalid_value(format!(
                "rows, cols, and values must have the same length; got {}, {}, and {}",
                rows.len(),
                cols.len(),
                values.len()
            )));
        }
        let mut m = Self::new(dtype, nrows, ncols);
        for ((r, c), x) in rows.into_iter().zip(cols).zip(values) {
            let pos = Position::matrix(r, c);
            if m.data.get(pos).is_some() {
                return Err(Error::invalid_value(format!(
                    "duplicate index ({r}, {c}) in from_coo"
                )));
            }
            m.data.insert(pos, x)?;
        }
        Ok(m)
    }

    pub(crate) fn from_parts(name: String, data: Sparse) -> Self {
        Self { name, data }
    }

    /// Number of rows
    pub fn nrows(&self) -> u64 {
        match self.data.shape() {
            Shape::Matrix(r, _) => r,
            _ => 0,
        }
    }

    /// Number of columns
    pub fn ncols(&self) -> u64 {
        match self.data.shape() {
            Shape::Matrix(_, c) => c,
            _ => 0,
        }
    }

    /// Value at `(row, col)`, if stored
    pub fn get(&self, row: u64, col: u64) -> Option<Value> {
        self.data.get(Position::matrix(row, col))
    }

    /// Store `value` at `(row, col)`
    pub fn set(&mut self, row: u64, col: u64, value: impl Into<Value>) -> Result<()> {
        self.data.insert(Position::matrix(row, col), value.into())
    }

    /// Remove the entry at `(row, col)`
    pub fn remove(&mut self, row: u64, col: u64) -> Option<Value> {
        self.data.remove(Position::matrix(row, col))
    }

    /// Rows, columns, and values of the stored entries
    pub fn to_coo(&self) -> (Vec<u64>, Vec<u64>, Vec<Value>) {
        let mut rows = Vec::with_capacity(self.nvals());
        let mut cols = Vec::with_capacity(self.nvals());
        let mut values = Vec::with_capacity(self.nvals());
        for (p, v) in self.data.iter() {
            rows.push(p.row);
            cols.push(p.col);
            values.push(v);
        }
        (rows, cols, values)
    }

    /// Transposed view; the transpose is applied by the engine through the descriptor
    pub fn t(&self) -> Transposed<'_> {
        Transposed(self)
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

/// A matrix read with rows and columns swapped
#[derive(Copy, Clone, Debug)]
pub struct Transposed<'a>(pub(crate) &'a Matrix);

impl<'a> Transposed<'a> {
    /// The matrix being viewed
    pub fn matrix(&self) -> &'a Matrix {
        self.0
    }

    /// Transposed shape
    pub fn shape(&self) -> Shape {
        self.0.shape().transposed()
    }

    /// Value at `(row, col)` of the transpose
    pub fn get(&self, row: u64, col: u64) -> Option<Value> {
        self.0.get(col, row)
    }

    /// The original matrix
    pub fn t(&self) -> &'a Matrix {
        self.0
    }
}

impl AlgebraicOperand for Transposed<'_> {
    fn operand(&self) -> Operand<'_> {
        Operand::Transposed(self.0)
    }
}
