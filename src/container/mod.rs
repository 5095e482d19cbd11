//! Sparse containers
//!
//! [`Scalar`], [`Vector`] and [`Matrix`] are named, typed sparse collections.
//! They own their entries as [`Sparse`] storage, which is also what the compute
//! engine reads and writes. Containers are plain data: every algebraic
//! operation on them goes through a [`Context`](crate::Context) and returns a
//! deferred [`Expression`](crate::expr::Expression).

mod id;
mod mask;
mod matrix;
mod operand;
mod scalar;
mod shape;
mod sparse;
mod vector;

pub use mask::Mask;
pub use matrix::{Matrix, Transposed};
pub use operand::{AlgebraicOperand, Operand, OperandKind};
pub use scalar::Scalar;
pub use shape::Shape;
pub use sparse::Sparse;
pub use vector::Vector;

pub(crate) use id::next_name;

use crate::dtype::{DType, Value};
use crate::error::{Error, Result};
use crate::ops::Position;

/// Storage access shared by every container type
///
/// This is the object-safe surface used for assignment targets.
pub trait Collection {
    /// Container name
    fn name(&self) -> &str;

    /// Stored entries
    fn data(&self) -> &Sparse;

    /// Mutable stored entries
    fn data_mut(&mut self) -> &mut Sparse;
}

/// Coordinate lists of a container's entries
///
/// `cols` is empty for vectors; `rows` and `cols` are empty for scalars.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Coo {
    /// Row (or vector) indices
    pub rows: Vec<u64>,
    /// Column indices
    pub cols: Vec<u64>,
    /// Values
    pub values: Vec<Value>,
}

/// Inherent methods every container type shares
macro_rules! container_common {
    ($ty:ident) => {
        impl $ty {
            /// Container name
            pub fn name(&self) -> &str {
                &self.name
            }

            /// Rename the container
            pub fn set_name(&mut self, name: impl Into<String>) {
                self.name = name.into();
            }

            /// Element type
            pub fn dtype(&self) -> $crate::dtype::DType {
                self.data.dtype()
            }

            /// Shape
            pub fn shape(&self) -> $crate::container::Shape {
                self.data.shape()
            }

            /// Number of dimensions
            pub fn ndim(&self) -> usize {
                self.data.shape().ndim()
            }

            /// Number of stored entries
            pub fn nvals(&self) -> usize {
                self.data.nvals()
            }

            /// Whether nothing is stored
            pub fn is_empty(&self) -> bool {
                self.data.is_empty()
            }

            /// Remove every entry
            pub fn clear(&mut self) {
                self.data.clear();
            }

            /// Stored entries
            pub fn data(&self) -> &$crate::container::Sparse {
                &self.data
            }

            /// Equal shape, pattern, and values (dtypes are promoted)
            pub fn isequal(&self, other: &Self) -> bool {
                self.data.isequal(&other.data, false)
            }

            /// Like `isequal`, within `rel_tol` / `abs_tol`
            pub fn isclose(&self, other: &Self, rel_tol: f64, abs_tol: f64) -> bool {
                self.data.isclose(&other.data, rel_tol, abs_tol, false)
            }

            /// Stored entries in row-major order
            pub fn iter(&self) -> impl Iterator<Item = ($crate::ops::Position, $crate::dtype::Value)> + '_ {
                self.data.iter()
            }

            /// Copy with every value cast to `dtype` and a fresh name
            pub fn dup(&self, dtype: Option<$crate::dtype::DType>) -> Self {
                let data = match dtype {
                    Some(dt) => self.data.cast(dt),
                    None => self.data.clone(),
                };
                Self {
                    name: $crate::container::next_name(data.shape()),
                    data,
                }
            }
        }

        impl $crate::container::Collection for $ty {
            fn name(&self) -> &str {
                &self.name
            }

            fn data(&self) -> &$crate::container::Sparse {
                &self.data
            }

            fn data_mut(&mut self) -> &mut $crate::container::Sparse {
                &mut self.data
            }
        }

        impl $crate::container::AlgebraicOperand for $ty {
            fn operand(&self) -> $crate::container::Operand<'_> {
                $crate::container::Operand::from(self)
            }
        }
    };
}

pub(crate) use container_common;

/// Any materialized container
#[derive(Clone, Debug, PartialEq)]
pub enum Container {
    /// Rank 0
    Scalar(Scalar),
    /// Rank 1
    Vector(Vector),
    /// Rank 2
    Matrix(Matrix),
}

impl Container {
    /// Wrap engine output under `name`
    pub(crate) fn from_sparse(name: String, data: Sparse) -> Self {
        match data.shape() {
            Shape::Scalar => Self::Scalar(Scalar::from_parts(name, data)),
            Shape::Vector(_) => Self::Vector(Vector::from_parts(name, data)),
            Shape::Matrix(..) => Self::Matrix(Matrix::from_parts(name, data)),
        }
    }

    fn parts(&self) -> (&str, &Sparse) {
        match self {
            Self::Scalar(s) => (s.name(), s.data()),
            Self::Vector(v) => (v.name(), v.data()),
            Self::Matrix(m) => (m.name(), m.data()),
        }
    }

    /// Container name
    pub fn name(&self) -> &str {
        self.parts().0
    }

    /// Rename the container
    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            Self::Scalar(s) => s.set_name(name),
            Self::Vector(v) => v.set_name(name),
            Self::Matrix(m) => m.set_name(name),
        }
    }

    /// Element type
    pub fn dtype(&self) -> DType {
        self.parts().1.dtype()
    }

    /// Shape
    pub fn shape(&self) -> Shape {
        self.parts().1.shape()
    }

    /// Number of stored entries
    pub fn nvals(&self) -> usize {
        self.parts().1.nvals()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.parts().1.is_empty()
    }

    /// Value at an index list (`[]`, `[i]`, or `[row, col]`)
    pub fn get(&self, index: &[u64]) -> Result<Option<Value>> {
        let data = self.parts().1;
        let pos = data.shape().position(index)?;
        Ok(data.get(pos))
    }

    /// Scalar value; fails for vectors and matrices
    pub fn value(&self) -> Result<Option<Value>> {
        match self {
            Self::Scalar(s) => Ok(s.value()),
            other => Err(Error::invalid_type(format!(
                "value is only defined for Scalar, not {}",
                other.shape().type_name()
            ))),
        }
    }

    /// Coordinate lists of the stored entries
    pub fn to_coo(&self) -> Coo {
        let data = self.parts().1;
        let mut coo = Coo::default();
        for (pos, v) in data.iter() {
            match data.shape() {
                Shape::Scalar => {}
                Shape::Vector(_) => coo.rows.push(pos.row),
                Shape::Matrix(..) => {
                    coo.rows.push(pos.row);
                    coo.cols.push(pos.col);
                }
            }
            coo.values.push(v);
        }
        coo
    }

    /// Stored entries in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Position, Value)> + '_ {
        self.parts().1.iter()
    }

    /// Truthiness of a scalar; empty scalars are false
    pub fn as_bool(&self) -> Result<bool> {
        Ok(self.value()?.map(|v| v.truthy()).unwrap_or(false))
    }

    /// Scalar value as an exact integer
    pub fn as_i64(&self) -> Result<i64> {
        self.value()?
            .ok_or_else(|| Error::invalid_value(format!("{} is empty", self.name())))?
            .try_to_i64()
    }

    /// Scalar value as a float
    pub fn as_f64(&self) -> Result<f64> {
        self.value()?
            .map(|v| v.to_f64())
            .ok_or_else(|| Error::invalid_value(format!("{} is empty", self.name())))
    }

    /// Equal shape, pattern, and values (dtypes are promoted)
    pub fn isequal(&self, other: &Container) -> bool {
        self.parts().1.isequal(other.parts().1, false)
    }

    /// Like [`Container::isequal`], within tolerances
    pub fn isclose(&self, other: &Container, rel_tol: f64, abs_tol: f64) -> bool {
        self.parts().1.isclose(other.parts().1, rel_tol, abs_tol, false)
    }

    /// The vector inside, if this is one
    pub fn into_vector(self) -> Result<Vector> {
        match self {
            Self::Vector(v) => Ok(v),
            other => Err(Error::invalid_type(format!(
                "expected Vector, got {}",
                other.shape().type_name()
            ))),
        }
    }

    /// The matrix inside, if this is one
    pub fn into_matrix(self) -> Result<Matrix> {
        match self {
            Self::Matrix(m) => Ok(m),
            other => Err(Error::invalid_type(format!(
                "expected Matrix, got {}",
                other.shape().type_name()
            ))),
        }
    }

    /// The scalar inside, if this is one
    pub fn into_scalar(self) -> Result<Scalar> {
        match self {
            Self::Scalar(s) => Ok(s),
            other => Err(Error::invalid_type(format!(
                "expected Scalar, got {}",
                other.shape().type_name()
            ))),
        }
    }
}

impl Collection for Container {
    fn name(&self) -> &str {
        self.parts().0
    }

    fn data(&self) -> &Sparse {
        self.parts().1
    }

    fn data_mut(&mut self) -> &mut Sparse {
        match self {
            Self::Scalar(s) => s.data_mut(),
            Self::Vector(v) => v.data_mut(),
            Self::Matrix(m) => m.data_mut(),
        }
    }
}

impl AlgebraicOperand for Container {
    fn operand(&self) -> Operand<'_> {
        Operand::from(self)
    }
}

impl From<Scalar> for Container {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<Vector> for Container {
    fn from(v: Vector) -> Self {
        Self::Vector(v)
    }
}

impl From<Matrix> for Container {
    fn from(m: Matrix) -> Self {
        Self::Matrix(m)
    }
}
