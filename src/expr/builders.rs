//! Combinator builders
//!
//! Each builder checks operator kind and operand shapes, resolves the typed
//! operator, and captures its arguments. Expressions used as operands must be
//! computable at this point (see the autocompute rules in [`crate::expr`]).

use super::{Arg, Expression};
use crate::container::{Operand, Shape};
use crate::context::Context;
use crate::dtype::Value;
use crate::error::{Error, Result};
use crate::ops::{OpId, OpKind};
use crate::runtime::Method;

/// Union of patterns; `op` (a binary operator or monoid) combines overlapping entries
pub fn ewise_add<'a>(
    ctx: &'a Context,
    left: Operand<'a>,
    right: Operand<'a>,
    op: OpId,
) -> Result<Expression<'a>> {
    ewise(ctx, Method::EwiseAdd, left, right, op)
}

/// Intersection of patterns
pub fn ewise_mult<'a>(
    ctx: &'a Context,
    left: Operand<'a>,
    right: Operand<'a>,
    op: OpId,
) -> Result<Expression<'a>> {
    ewise(ctx, Method::EwiseMult, left, right, op)
}

/// Union of patterns; an entry only in `left` is combined with `right_fill`,
/// an entry only in `right` with `left_fill`
pub fn ewise_union<'a>(
    ctx: &'a Context,
    left: Operand<'a>,
    right: Operand<'a>,
    op: OpId,
    left_fill: impl Into<Value>,
    right_fill: impl Into<Value>,
) -> Result<Expression<'a>> {
    let method = Method::EwiseUnion {
        left: left_fill.into(),
        right: right_fill.into(),
    };
    ewise(ctx, method, left, right, op)
}

fn ewise<'a>(
    ctx: &'a Context,
    method: Method,
    left: Operand<'a>,
    right: Operand<'a>,
    op: OpId,
) -> Result<Expression<'a>> {
    let name = method.name();
    expect_kind(ctx, op, name, &[OpKind::Binary, OpKind::Monoid])?;
    let (a, b) = pair(left, right, name)?;
    if a.shape() != b.shape() {
        return Err(Error::dimension_mismatch(name, &a.shape().dims(), &b.shape().dims()));
    }
    let typed = ctx.registry().resolve(op, &[a.dtype(), b.dtype()])?;
    let (dtype, shape) = (typed.return_type(), a.shape());
    Ok(Expression::build(ctx, method, Some(typed), vec![a, b], dtype, shape))
}

/// Unary operator on every entry
pub fn apply<'a>(ctx: &'a Context, x: Operand<'a>, op: OpId) -> Result<Expression<'a>> {
    expect_kind(ctx, op, "apply", &[OpKind::Unary])?;
    let a = Arg::from_operand(x, "apply")?;
    let typed = ctx.registry().resolve(op, &[a.dtype()])?;
    let (dtype, shape) = (typed.return_type(), a.shape());
    Ok(Expression::build(ctx, Method::Apply, Some(typed), vec![a], dtype, shape))
}

/// `op(left, x)` for every entry `x` of `right`; `left` must be a scalar
pub fn apply_left<'a>(
    ctx: &'a Context,
    left: Operand<'a>,
    right: Operand<'a>,
    op: OpId,
) -> Result<Expression<'a>> {
    expect_kind(ctx, op, "apply", &[OpKind::Binary, OpKind::Monoid])?;
    let (s, a) = pair(left, right, "apply")?;
    let bound = s.bound_value("apply")?;
    let typed = ctx.registry().resolve(op, &[s.dtype(), a.dtype()])?;
    let (dtype, shape) = (typed.return_type(), a.shape());
    Ok(Expression::build(
        ctx,
        Method::ApplyBindFirst(bound.cast(s.dtype())),
        Some(typed),
        vec![a],
        dtype,
        shape,
    ))
}

/// `op(x, right)` for every entry `x` of `left`; `right` must be a scalar
pub fn apply_right<'a>(
    ctx: &'a Context,
    left: Operand<'a>,
    right: Operand<'a>,
    op: OpId,
) -> Result<Expression<'a>> {
    expect_kind(ctx, op, "apply", &[OpKind::Binary, OpKind::Monoid])?;
    let (a, s) = pair(left, right, "apply")?;
    let bound = s.bound_value("apply")?;
    let typed = ctx.registry().resolve(op, &[a.dtype(), s.dtype()])?;
    let (dtype, shape) = (typed.return_type(), a.shape());
    Ok(Expression::build(
        ctx,
        Method::ApplyBindSecond(bound.cast(s.dtype())),
        Some(typed),
        vec![a],
        dtype,
        shape,
    ))
}

/// Index-unary operator on every entry
pub fn apply_index<'a>(
    ctx: &'a Context,
    x: Operand<'a>,
    op: OpId,
    thunk: impl Into<Value>,
) -> Result<Expression<'a>> {
    expect_kind(ctx, op, "apply", &[OpKind::IndexUnary])?;
    let a = Arg::from_operand(x, "apply")?;
    let typed = ctx.registry().resolve(op, &[a.dtype()])?;
    let (dtype, shape) = (typed.return_type(), a.shape());
    let method = Method::ApplyIndex {
        thunk: thunk.into(),
    };
    Ok(Expression::build(ctx, method, Some(typed), vec![a], dtype, shape))
}

/// Keep the entries for which a select (or index-unary) operator is true
pub fn select<'a>(
    ctx: &'a Context,
    x: Operand<'a>,
    op: OpId,
    thunk: impl Into<Value>,
) -> Result<Expression<'a>> {
    expect_kind(ctx, op, "select", &[OpKind::Select, OpKind::IndexUnary])?;
    let a = Arg::from_operand(x, "select")?;
    let typed = ctx.registry().resolve(op, &[a.dtype()])?;
    let (dtype, shape) = (a.dtype(), a.shape());
    let method = Method::Select {
        thunk: thunk.into(),
    };
    Ok(Expression::build(ctx, method, Some(typed), vec![a], dtype, shape))
}

/// Matrix-matrix multiply over a semiring
pub fn mxm<'a>(ctx: &'a Context, left: Operand<'a>, right: Operand<'a>, op: OpId) -> Result<Expression<'a>> {
    multiply(ctx, Method::Mxm, left, right, op)
}

/// Matrix-vector multiply over a semiring
pub fn mxv<'a>(ctx: &'a Context, left: Operand<'a>, right: Operand<'a>, op: OpId) -> Result<Expression<'a>> {
    multiply(ctx, Method::Mxv, left, right, op)
}

/// Vector-matrix multiply over a semiring
pub fn vxm<'a>(ctx: &'a Context, left: Operand<'a>, right: Operand<'a>, op: OpId) -> Result<Expression<'a>> {
    multiply(ctx, Method::Vxm, left, right, op)
}

fn multiply<'a>(
    ctx: &'a Context,
    method: Method,
    left: Operand<'a>,
    right: Operand<'a>,
    op: OpId,
) -> Result<Expression<'a>> {
    let name = method.name();
    expect_kind(ctx, op, name, &[OpKind::Semiring])?;
    let a = Arg::from_operand(left, name)?;
    let b = Arg::from_operand(right, name)?;
    let shape = match (&method, a.shape(), b.shape()) {
        (Method::Mxm, Shape::Matrix(m, k1), Shape::Matrix(k2, n)) if k1 == k2 => Shape::Matrix(m, n),
        (Method::Mxv, Shape::Matrix(m, k), Shape::Vector(n)) if k == n => Shape::Vector(m),
        (Method::Vxm, Shape::Vector(n), Shape::Matrix(k, m)) if k == n => Shape::Vector(m),
        (_, sa, sb) => return Err(Error::dimension_mismatch(name, &sa.dims(), &sb.dims())),
    };
    let typed = ctx.registry().resolve(op, &[a.dtype(), b.dtype()])?;
    let dtype = typed.return_type();
    Ok(Expression::build(ctx, method, Some(typed), vec![a, b], dtype, shape))
}

/// Reduce every entry to a scalar with a monoid (or a binary operator that has one)
pub fn reduce<'a>(ctx: &'a Context, x: Operand<'a>, op: OpId) -> Result<Expression<'a>> {
    reduction(ctx, Method::Reduce, x, op)
}

/// Reduce each row of a matrix to one vector entry
pub fn reduce_rowwise<'a>(ctx: &'a Context, x: Operand<'a>, op: OpId) -> Result<Expression<'a>> {
    reduction(ctx, Method::ReduceRowwise, x, op)
}

/// Reduce each column of a matrix to one vector entry
pub fn reduce_columnwise<'a>(ctx: &'a Context, x: Operand<'a>, op: OpId) -> Result<Expression<'a>> {
    reduction(ctx, Method::ReduceColumnwise, x, op)
}

fn reduction<'a>(ctx: &'a Context, method: Method, x: Operand<'a>, op: OpId) -> Result<Expression<'a>> {
    let name = method.name();
    let monoid = match expect_kind(ctx, op, name, &[OpKind::Monoid, OpKind::Binary])? {
        OpKind::Binary => ctx.registry().monoid_of(op)?.ok_or_else(|| {
            Error::invalid_type(format!(
                "{name} requires a Monoid; BinaryOp {} has no monoid",
                ctx.registry().name(op).unwrap_or_default()
            ))
        })?,
        _ => op,
    };
    let a = Arg::from_operand(x, name)?;
    let shape = match (&method, a.shape()) {
        (Method::Reduce, _) => Shape::Scalar,
        (Method::ReduceRowwise, Shape::Matrix(m, _)) => Shape::Vector(m),
        (Method::ReduceColumnwise, Shape::Matrix(_, n)) => Shape::Vector(n),
        (_, other) => {
            return Err(Error::invalid_type(format!(
                "{name} requires a Matrix, got {}",
                other.type_name()
            )))
        }
    };
    let typed = ctx.registry().resolve(monoid, &[a.dtype()])?;
    let dtype = typed.return_type();
    Ok(Expression::build(ctx, method, Some(typed), vec![a], dtype, shape))
}

/// Capture two operands; a literal takes its dtype from the other side
fn pair<'a>(left: Operand<'a>, right: Operand<'a>, attr: &str) -> Result<(Arg<'a>, Arg<'a>)> {
    let hint = |o: &Operand<'_>| (!matches!(o, Operand::Literal(_))).then(|| o.dtype());
    let a = Arg::with_hint(left, hint(&right), attr)?;
    let b = Arg::with_hint(right, hint(&left), attr)?;
    Ok((a, b))
}

fn expect_kind(ctx: &Context, op: OpId, method: &str, allowed: &[OpKind]) -> Result<OpKind> {
    let kind = ctx.registry().kind(op)?;
    if allowed.contains(&kind) {
        return Ok(kind);
    }
    let expected: Vec<&str> = allowed.iter().map(|k| k.type_name()).collect();
    Err(Error::invalid_type(format!(
        "{method} requires a {}, got {} {}",
        expected.join(" or "),
        kind.type_name(),
        ctx.registry().name(op)?
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Matrix, Scalar, Vector};
    use crate::dtype::DType;

    #[test]
    fn test_ewise_rejects_semiring_and_shape_mismatch() {
        let ctx = Context::new().unwrap();
        let u = Vector::new(DType::I64, 3);
        let v = Vector::new(DType::I64, 4);
        let plus = ctx.binary("plus").unwrap();
        assert!(matches!(
            ewise_add(&ctx, (&u).into(), (&v).into(), plus),
            Err(Error::DimensionMismatch { .. })
        ));
        let sr = ctx.semiring("plus_times").unwrap();
        assert!(ewise_mult(&ctx, (&u).into(), (&u).into(), sr).unwrap_err().is_type_error());
    }

    #[test]
    fn test_result_types() {
        let ctx = Context::new().unwrap();
        let u = Vector::new(DType::I32, 3);
        let v = Vector::new(DType::F64, 3);
        let e = ewise_add(&ctx, (&u).into(), (&v).into(), ctx.binary("plus").unwrap()).unwrap();
        assert_eq!(e.dtype(), DType::F64);
        let lt = ewise_mult(&ctx, (&u).into(), (&v).into(), ctx.binary("lt").unwrap()).unwrap();
        assert_eq!(lt.dtype(), DType::Bool);
    }

    #[test]
    fn test_mxv_and_reduce() {
        let ctx = Context::new().unwrap();
        let a = Matrix::from_coo([0, 0, 1], [0, 1, 1], [1i64, 2, 3], DType::I64, 2, 2).unwrap();
        let x = Vector::from_coo([0, 1], [10i64, 1], DType::I64, 2).unwrap();
        let y = mxv(&ctx, (&a).into(), (&x).into(), ctx.semiring("plus_times").unwrap())
            .unwrap()
            .new()
            .unwrap();
        assert_eq!(y.get(&[0]).unwrap(), Some(Value::Int(12)));
        assert_eq!(y.get(&[1]).unwrap(), Some(Value::Int(3)));

        let total = reduce(&ctx, (&a).into(), ctx.binary("plus").unwrap()).unwrap();
        assert_eq!(total.shape(), Shape::Scalar);
        assert_eq!(total.new().unwrap().as_i64().unwrap(), 6);

        let cols = reduce_columnwise(&ctx, a.t().into(), ctx.monoid("max").unwrap())
            .unwrap()
            .new()
            .unwrap();
        assert_eq!(cols.shape(), Shape::Vector(2));
        assert_eq!(cols.get(&[0]).unwrap(), Some(Value::Int(2)));
        assert!(reduce_rowwise(&ctx, (&x).into(), ctx.monoid("plus").unwrap()).is_err());
    }

    #[test]
    fn test_mxm_dimension_check() {
        let ctx = Context::new().unwrap();
        let a = Matrix::new(DType::I64, 2, 3);
        let sr = ctx.semiring("plus_times").unwrap();
        assert!(mxm(&ctx, (&a).into(), (&a).into(), sr).is_err());
        let e = mxm(&ctx, (&a).into(), a.t().into(), sr).unwrap();
        assert_eq!(e.shape(), Shape::Matrix(2, 2));
    }

    #[test]
    fn test_apply_binds_scalars() {
        let ctx = Context::new().unwrap();
        let v = Vector::from_coo([0, 2], [1i64, 5], DType::I64, 3).unwrap();
        let minus = ctx.binary("minus").unwrap();
        let left = apply_left(&ctx, 10i64.into(), (&v).into(), minus).unwrap().new().unwrap();
        assert_eq!(left.get(&[2]).unwrap(), Some(Value::Int(5)));
        let right = apply_right(&ctx, (&v).into(), 10i64.into(), minus).unwrap().new().unwrap();
        assert_eq!(right.get(&[2]).unwrap(), Some(Value::Int(-5)));
        let empty = Scalar::new(DType::I64);
        assert!(apply_right(&ctx, (&v).into(), (&empty).into(), minus)
            .unwrap_err()
            .is_value_error());
    }

    #[test]
    fn test_select_keeps_dtype() {
        let ctx = Context::new().unwrap();
        let v = Vector::from_coo([0, 1, 2], [1.5f64, -2.0, 3.0], DType::F64, 3).unwrap();
        let e = select(&ctx, (&v).into(), ctx.select("valuegt").unwrap(), 0.0f64).unwrap();
        assert_eq!(e.dtype(), DType::F64);
        let kept = e.new().unwrap();
        assert_eq!(kept.to_coo().rows, vec![0, 2]);
    }
}
