//! Operands of algebraic operations

use super::{Container, Matrix, Scalar, Shape, Transposed, Vector};
use crate::context::Context;
use crate::dtype::{Complex128, DType, Value};
use crate::error::Result;
use crate::expr::{self, Expression};
use crate::ops::OpId;

/// Anything that can appear as an argument of a combinator or infix operator
#[derive(Copy, Clone, Debug)]
pub enum Operand<'a> {
    /// A plain value; its dtype follows the other operand when it fits
    Literal(Value),
    /// A scalar container
    Scalar(&'a Scalar),
    /// A vector
    Vector(&'a Vector),
    /// A matrix
    Matrix(&'a Matrix),
    /// A matrix read transposed
    Transposed(&'a Matrix),
    /// A deferred expression; using it requires materialization
    Expr(&'a Expression<'a>),
}

/// Runtime category of an operand
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// Plain value
    Literal,
    /// Rank 0 container
    Scalar,
    /// Rank 1 container
    Vector,
    /// Rank 2 container
    Matrix,
    /// Rank 2 container read transposed
    Transposed,
}

impl<'a> Operand<'a> {
    /// Category; expressions report the category of their result
    pub fn kind(&self) -> OperandKind {
        match self {
            Self::Literal(_) => OperandKind::Literal,
            Self::Scalar(_) => OperandKind::Scalar,
            Self::Vector(_) => OperandKind::Vector,
            Self::Matrix(_) => OperandKind::Matrix,
            Self::Transposed(_) => OperandKind::Transposed,
            Self::Expr(e) => match e.shape() {
                Shape::Scalar => OperandKind::Scalar,
                Shape::Vector(_) => OperandKind::Vector,
                Shape::Matrix(..) => OperandKind::Matrix,
            },
        }
    }

    /// Element type
    pub fn dtype(&self) -> DType {
        match self {
            Self::Literal(v) => v.dtype_hint(),
            Self::Scalar(s) => s.dtype(),
            Self::Vector(v) => v.dtype(),
            Self::Matrix(m) | Self::Transposed(m) => m.dtype(),
            Self::Expr(e) => e.dtype(),
        }
    }

    /// Shape as seen by the operation (transposed views report swapped dimensions)
    pub fn shape(&self) -> Shape {
        match self {
            Self::Literal(_) => Shape::Scalar,
            Self::Scalar(s) => s.shape(),
            Self::Vector(v) => v.shape(),
            Self::Matrix(m) => m.shape(),
            Self::Transposed(m) => m.shape().transposed(),
            Self::Expr(e) => e.shape(),
        }
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape().ndim()
    }

    /// Vectors, matrices, and transposed matrices
    pub fn is_container(&self) -> bool {
        matches!(
            self.kind(),
            OperandKind::Vector | OperandKind::Matrix | OperandKind::Transposed
        )
    }

    /// Literals and scalar containers
    pub fn is_scalar(&self) -> bool {
        !self.is_container()
    }

    /// Name of the underlying container, if it has one yet
    pub fn name(&self) -> Option<String> {
        match self {
            Self::Literal(_) => None,
            Self::Scalar(s) => Some(s.name().to_string()),
            Self::Vector(v) => Some(v.name().to_string()),
            Self::Matrix(m) | Self::Transposed(m) => Some(m.name().to_string()),
            Self::Expr(e) => e.cached().map(|c| c.name().to_string()),
        }
    }
}

impl<'a> From<&'a Scalar> for Operand<'a> {
    fn from(s: &'a Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl<'a> From<&'a Vector> for Operand<'a> {
    fn from(v: &'a Vector) -> Self {
        Self::Vector(v)
    }
}

impl<'a> From<&'a Matrix> for Operand<'a> {
    fn from(m: &'a Matrix) -> Self {
        Self::Matrix(m)
    }
}

impl<'a> From<Transposed<'a>> for Operand<'a> {
    fn from(t: Transposed<'a>) -> Self {
        Self::Transposed(t.0)
    }
}

impl<'a> From<&'a Container> for Operand<'a> {
    fn from(c: &'a Container) -> Self {
        match c {
            Container::Scalar(s) => Self::Scalar(s),
            Container::Vector(v) => Self::Vector(v),
            Container::Matrix(m) => Self::Matrix(m),
        }
    }
}

impl<'a, 'e: 'a> From<&'a Expression<'e>> for Operand<'a> {
    fn from(e: &'a Expression<'e>) -> Self {
        Self::Expr(e)
    }
}

macro_rules! literal_operand {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Operand<'_> {
                fn from(v: $t) -> Self {
                    Self::Literal(Value::from(v))
                }
            }
        )*
    };
}

literal_operand!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, Complex128, Value);

/// The combinators shared by scalars, vectors, matrices, transposed views,
/// and expressions
///
/// Every method builds a deferred [`Expression`]; nothing is computed until
/// the expression is materialized or written into a container.
pub trait AlgebraicOperand {
    /// View as an operand
    fn operand(&self) -> Operand<'_>;

    /// Number of dimensions
    fn rank(&self) -> usize {
        self.operand().ndim()
    }

    /// Element type
    fn element_type(&self) -> DType {
        self.operand().dtype()
    }

    /// Union of patterns; `op` combines overlapping entries
    fn ewise_add<'a>(
        &'a self,
        ctx: &'a Context,
        other: impl Into<Operand<'a>>,
        op: OpId,
    ) -> Result<Expression<'a>> {
        expr::ewise_add(ctx, self.operand(), other.into(), op)
    }

    /// Intersection of patterns
    fn ewise_mult<'a>(
        &'a self,
        ctx: &'a Context,
        other: impl Into<Operand<'a>>,
        op: OpId,
    ) -> Result<Expression<'a>> {
        expr::ewise_mult(ctx, self.operand(), other.into(), op)
    }

    /// Union of patterns; one-sided entries are combined with a fill value
    fn ewise_union<'a>(
        &'a self,
        ctx: &'a Context,
        other: impl Into<Operand<'a>>,
        op: OpId,
        left_fill: impl Into<Value>,
        right_fill: impl Into<Value>,
    ) -> Result<Expression<'a>> {
        expr::ewise_union(ctx, self.operand(), other.into(), op, left_fill, right_fill)
    }

    /// Unary operator on every entry
    fn apply<'a>(&'a self, ctx: &'a Context, op: OpId) -> Result<Expression<'a>> {
        expr::apply(ctx, self.operand(), op)
    }

    /// `op(left, x)` for every entry `x`
    fn apply_left<'a>(
        &'a self,
        ctx: &'a Context,
        left: impl Into<Operand<'a>>,
        op: OpId,
    ) -> Result<Expression<'a>> {
        expr::apply_left(ctx, left.into(), self.operand(), op)
    }

    /// `op(x, right)` for every entry `x`
    fn apply_right<'a>(
        &'a self,
        ctx: &'a Context,
        right: impl Into<Operand<'a>>,
        op: OpId,
    ) -> Result<Expression<'a>> {
        expr::apply_right(ctx, self.operand(), right.into(), op)
    }

    /// Index-unary operator on every entry
    fn apply_index<'a>(
        &'a self,
        ctx: &'a Context,
        op: OpId,
        thunk: impl Into<Value>,
    ) -> Result<Expression<'a>> {
        expr::apply_index(ctx, self.operand(), op, thunk)
    }

    /// Keep the entries a select operator accepts
    fn select<'a>(
        &'a self,
        ctx: &'a Context,
        op: OpId,
        thunk: impl Into<Value>,
    ) -> Result<Expression<'a>> {
        expr::select(ctx, self.operand(), op, thunk)
    }

    /// Matrix-matrix multiply over a semiring
    fn mxm<'a>(
        &'a self,
        ctx: &'a Context,
        other: impl Into<Operand<'a>>,
        op: OpId,
    ) -> Result<Expression<'a>> {
        expr::mxm(ctx, self.operand(), other.into(), op)
    }

    /// Matrix-vector multiply over a semiring
    fn mxv<'a>(
        &'a self,
        ctx: &'a Context,
        other: impl Into<Operand<'a>>,
        op: OpId,
    ) -> Result<Expression<'a>> {
        expr::mxv(ctx, self.operand(), other.into(), op)
    }

    /// Vector-matrix multiply over a semiring
    fn vxm<'a>(
        &'a self,
        ctx: &'a Context,
        other: impl Into<Operand<'a>>,
        op: OpId,
    ) -> Result<Expression<'a>> {
        expr::vxm(ctx, self.operand(), other.into(), op)
    }

    /// Reduce every entry to a scalar
    fn reduce<'a>(&'a self, ctx: &'a Context, op: OpId) -> Result<Expression<'a>> {
        expr::reduce(ctx, self.operand(), op)
    }

    /// Reduce each row of a matrix
    fn reduce_rowwise<'a>(&'a self, ctx: &'a Context, op: OpId) -> Result<Expression<'a>> {
        expr::reduce_rowwise(ctx, self.operand(), op)
    }

    /// Reduce each column of a matrix
    fn reduce_columnwise<'a>(&'a self, ctx: &'a Context, op: OpId) -> Result<Expression<'a>> {
        expr::reduce_columnwise(ctx, self.operand(), op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_shapes() {
        let m = Matrix::new(DType::I64, 2, 3);
        assert_eq!(Operand::from(&m).kind(), OperandKind::Matrix);
        let t = Operand::from(m.t());
        assert_eq!(t.kind(), OperandKind::Transposed);
        assert_eq!(t.shape(), Shape::Matrix(3, 2));
        assert!(t.is_container());
        let lit = Operand::from(2.5f64);
        assert_eq!(lit.dtype(), DType::F64);
        assert!(lit.is_scalar());
        assert_eq!(lit.name(), None);
        let s = Scalar::from_value(1i64);
        assert!(Operand::from(&s).is_scalar());
        assert_eq!(s.rank(), 0);
    }

    #[test]
    fn test_container_operand_follows_variant() {
        let c = Container::from(Vector::new(DType::F32, 4));
        assert_eq!(Operand::from(&c).kind(), OperandKind::Vector);
        assert_eq!(c.element_type(), DType::F32);
    }
}
