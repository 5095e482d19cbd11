//! Shape of a container

use crate::error::{Error, Result};
use crate::ops::Position;
use smallvec::SmallVec;
use std::fmt;

/// Dimensions of a scalar, vector, or matrix
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Rank 0
    Scalar,
    /// Rank 1 with `size` positions
    Vector(u64),
    /// Rank 2 with `nrows x ncols` positions
    Matrix(u64, u64),
}

impl Shape {
    /// Number of dimensions
    #[inline]
    pub fn ndim(self) -> usize {
        match self {
            Self::Scalar => 0,
            Self::Vector(_) => 1,
            Self::Matrix(..) => 2,
        }
    }

    /// Dimensions as a list
    pub fn dims(self) -> SmallVec<[u64; 2]> {
        match self {
            Self::Scalar => SmallVec::new(),
            Self::Vector(n) => smallvec::smallvec![n],
            Self::Matrix(r, c) => smallvec::smallvec![r, c],
        }
    }

    /// Shape with rows and columns swapped
    pub fn transposed(self) -> Self {
        match self {
            Self::Matrix(r, c) => Self::Matrix(c, r),
            other => other,
        }
    }

    /// Name of the container type with this shape
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Scalar => "Scalar",
            Self::Vector(_) => "Vector",
            Self::Matrix(..) => "Matrix",
        }
    }

    /// Whether `pos` lies inside the shape
    pub fn contains(self, pos: Position) -> bool {
        match self {
            Self::Scalar => pos == Position::default(),
            Self::Vector(n) => pos.row < n && pos.col == 0,
            Self::Matrix(r, c) => pos.row < r && pos.col < c,
        }
    }

    /// Number of positions
    pub fn capacity(self) -> u128 {
        match self {
            Self::Scalar => 1,
            Self::Vector(n) => n as u128,
            Self::Matrix(r, c) => r as u128 * c as u128,
        }
    }

    /// Convert an index list into a position, checking rank and bounds
    pub fn position(self, index: &[u64]) -> Result<Position> {
        let dims = self.dims();
        let pos = match index {
            [] if dims.is_empty() => Position::default(),
            [i] if dims.len() == 1 => Position::vector(*i),
            [r, c] if dims.len() == 2 => Position::matrix(*r, *c),
            _ => {
                return Err(Error::invalid_value(format!(
                    "{} index must have {} coordinate(s); got {}",
                    self.type_name(),
                    dims.len(),
                    index.len()
                )))
            }
        };
        for (&i, &size) in index.iter().zip(dims.iter()) {
            if i >= size {
                return Err(Error::IndexOutOfBounds { index: i, size });
            }
        }
        Ok(pos)
    }

    /// Index list of a position inside this shape
    pub fn index_of(self, pos: Position) -> SmallVec<[u64; 2]> {
        match self {
            Self::Scalar => SmallVec::new(),
            Self::Vector(_) => smallvec::smallvec![pos.row],
            Self::Matrix(..) => smallvec::smallvec![pos.row, pos.col],
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "()"),
            Self::Vector(n) => write!(f, "({n},)"),
            Self::Matrix(r, c) => write!(f, "({r}, {c})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_checks_rank_and_bounds() {
        let s = Shape::Matrix(2, 3);
        assert_eq!(s.position(&[1, 2]).unwrap(), Position::matrix(1, 2));
        assert!(matches!(
            s.position(&[2, 0]),
            Err(Error::IndexOutOfBounds { index: 2, size: 2 })
        ));
        assert!(s.position(&[1]).is_err());
        assert_eq!(Shape::Scalar.position(&[]).unwrap(), Position::default());
    }

    #[test]
    fn test_transposed() {
        assert_eq!(Shape::Matrix(2, 3).transposed(), Shape::Matrix(3, 2));
        assert_eq!(Shape::Vector(4).transposed(), Shape::Vector(4));
        assert_eq!(Shape::Matrix(2, 3).to_string(), "(2, 3)");
    }
}
