//! Infix operator dispatch
//!
//! Each infix function names a binary operator and a [`Role`]. [`call_op`]
//! picks the combinator from the runtime kinds of the operands:
//!
//! | left      | right     | combinator                                        |
//! |-----------|-----------|---------------------------------------------------|
//! | container | container | `Outer` → ewise_add, `Union` → ewise_union, `Plain` → ewise_mult |
//! | container | scalar    | apply with the scalar bound second                |
//! | scalar    | container | commuted op bound second, else op bound first     |
//! | scalar    | scalar    | same as container/container at rank 0            |
//!
//! Containers are vectors, matrices, and transposed matrices. A literal on
//! the left of a scalar/scalar operation is moved to the right through the
//! commuted operator when one exists.
//!
//! # In-place forms
//!
//! `iadd`, `ixor`, and `ior` accumulate into the target (`target(op) << other`)
//! when `other` can be written in place. When `other` is a literal (for a
//! vector or matrix target) or a vector (for a matrix target), they compute
//! `target OP other` fresh and assign it. Every other in-place form always
//! computes fresh. Deferred expressions can never be updated in place.

use crate::container::{Collection, Container, Matrix, Operand, OperandKind, Scalar, Shape, Vector};
use crate::context::{Context, OutputSpec};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::expr::{self, Expression};
use crate::ops::{OpId, OpKind};

/// How a binary operator combines two patterns
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Intersection: only positions present in both
    Plain,
    /// Union; one-sided entries pass through unchanged
    Outer,
    /// Union; one-sided entries are combined with a zero fill
    Union,
}

/// Dispatch `left op right` under `role`
pub fn call_op<'a>(
    ctx: &'a Context,
    left: Operand<'a>,
    right: Operand<'a>,
    op: OpId,
    role: Role,
) -> Result<Expression<'a>> {
    match (left.is_container(), right.is_container()) {
        (true, true) => combine(ctx, left, right, op, role),
        (true, false) => expr::apply_right(ctx, left, right, op),
        (false, true) => match ctx.registry().commutes_to(op)? {
            Some(commuted) => expr::apply_right(ctx, right, left, commuted),
            None => expr::apply_left(ctx, left, right, op),
        },
        (false, false) => {
            if let Operand::Literal(_) = left {
                if let Some(commuted) = ctx.registry().commutes_to(op)? {
                    return combine(ctx, right, left, commuted, role);
                }
            }
            combine(ctx, left, right, op, role)
        }
    }
}

fn combine<'a>(
    ctx: &'a Context,
    left: Operand<'a>,
    right: Operand<'a>,
    op: OpId,
    role: Role,
) -> Result<Expression<'a>> {
    match role {
        Role::Outer => expr::ewise_add(ctx, left, right, op),
        Role::Union => expr::ewise_union(ctx, left, right, op, false, false),
        Role::Plain => expr::ewise_mult(ctx, left, right, op),
    }
}

/// Containers that can be the target of an in-place operator
pub trait InPlace {
    /// The storage to update, or an error naming `attr` if updating is impossible
    fn in_place_target(&mut self, attr: &str) -> Result<&mut dyn Collection>;
}

macro_rules! in_place_container {
    ($($t:ty),*) => {
        $(
            impl InPlace for $t {
                fn in_place_target(&mut self, _attr: &str) -> Result<&mut dyn Collection> {
                    Ok(self)
                }
            }
        )*
    };
}

in_place_container!(Scalar, Vector, Matrix, Container);

impl InPlace for Expression<'_> {
    fn in_place_target(&mut self, attr: &str) -> Result<&mut dyn Collection> {
        Err(self.refused(attr))
    }
}

/// Restriction of a logical operator to boolean operands
struct BoolOnly {
    name: &'static str,
    symbol: &'static str,
    uses: &'static str,
}

impl BoolOnly {
    fn check(&self, dtype: DType) -> Result<()> {
        if dtype == DType::Bool {
            return Ok(());
        }
        Err(Error::invalid_type(format!(
            "The {} infix operator, `{}`, is not supported for {dtype} dtype.  It is only supported for BOOL dtype (and it uses {}).",
            self.name, self.symbol, self.uses
        )))
    }
}

const UNION: &str = "ewise_add--the union";
const INTERSECTION: &str = "ewise_mult--the intersection";

const XOR: BoolOnly = BoolOnly { name: "xor", symbol: "x ^ y", uses: UNION };
const IXOR: BoolOnly = BoolOnly { name: "ixor", symbol: "x ^= y", uses: UNION };
const OR: BoolOnly = BoolOnly { name: "or", symbol: "x | y", uses: UNION };
const IOR: BoolOnly = BoolOnly { name: "ior", symbol: "x |= y", uses: UNION };
const AND: BoolOnly = BoolOnly { name: "and", symbol: "x & y", uses: INTERSECTION };
const IAND: BoolOnly = BoolOnly { name: "iand", symbol: "x &= y", uses: INTERSECTION };

fn in_place<T: InPlace + ?Sized>(
    ctx: &Context,
    target: &mut T,
    other: Operand<'_>,
    op: OpId,
    role: Role,
    attr: &str,
    restriction: Option<&BoolOnly>,
) -> Result<()> {
    let target = target.in_place_target(attr)?;
    let shape = target.data().shape();
    let fresh = (other.kind() == OperandKind::Vector && shape.ndim() == 2)
        || (shape != Shape::Scalar && !other.is_container());
    if role == Role::Outer && !fresh {
        if let Some(r) = restriction {
            r.check(other.dtype())?;
        }
        return ctx.update(target, other, OutputSpec::new().accum(op));
    }

    let snapshot = Container::from_sparse(target.name().to_string(), target.data().clone());
    let result = {
        let e = call_op(ctx, Operand::from(&snapshot), other, op, role)?;
        if let Some(r) = restriction {
            r.check(e.dtype())?;
        }
        e.new()?
    };
    ctx.update(target, &result, OutputSpec::new())
}

macro_rules! arithmetic_ops {
    ($($name:ident => $op:literal, $role:ident;)*) => {
        paste::paste! {
            $(
                #[doc = concat!("`left ", stringify!($name), " right` with `", $op, "` (", stringify!($role), " role)")]
                pub fn $name<'a>(
                    ctx: &'a Context,
                    left: impl Into<Operand<'a>>,
                    right: impl Into<Operand<'a>>,
                ) -> Result<Expression<'a>> {
                    let op = ctx.registry().lookup(OpKind::Binary, $op)?;
                    call_op(ctx, left.into(), right.into(), op, Role::$role)
                }

                #[doc = concat!("Reflected `", stringify!($name), "`: `right ", stringify!($name), " left`")]
                pub fn [<r $name>]<'a>(
                    ctx: &'a Context,
                    left: impl Into<Operand<'a>>,
                    right: impl Into<Operand<'a>>,
                ) -> Result<Expression<'a>> {
                    $name(ctx, right, left)
                }

                #[doc = concat!("In-place `", stringify!($name), "` into `target`")]
                pub fn [<i $name>]<'o, T: InPlace + ?Sized>(
                    ctx: &Context,
                    target: &mut T,
                    other: impl Into<Operand<'o>>,
                ) -> Result<()> {
                    let op = ctx.registry().lookup(OpKind::Binary, $op)?;
                    in_place(ctx, target, other.into(), op, Role::$role, concat!("i", stringify!($name)), None)
                }
            )*
        }
    };
}

arithmetic_ops! {
    add => "plus", Outer;
    sub => "minus", Union;
    mul => "times", Plain;
    truediv => "truediv", Plain;
    floordiv => "floordiv", Plain;
    modulo => "numpy.mod", Plain;
    pow => "pow", Plain;
}

macro_rules! comparison_ops {
    ($($name:ident => $op:literal;)*) => {
        $(
            #[doc = concat!("Element-wise `", $op, "` over the intersection of patterns")]
            pub fn $name<'a>(
                ctx: &'a Context,
                left: impl Into<Operand<'a>>,
                right: impl Into<Operand<'a>>,
            ) -> Result<Expression<'a>> {
                let op = ctx.registry().lookup(OpKind::Binary, $op)?;
                call_op(ctx, left.into(), right.into(), op, Role::Plain)
            }
        )*
    };
}

comparison_ops! {
    lt => "lt";
    le => "le";
    gt => "gt";
    ge => "ge";
    ne => "ne";
}

/// Element-wise `eq` over the intersection; refused when `left` is a deferred expression
pub fn eq<'a>(
    ctx: &'a Context,
    left: impl Into<Operand<'a>>,
    right: impl Into<Operand<'a>>,
) -> Result<Expression<'a>> {
    let (left, right) = (left.into(), right.into());
    if let Operand::Expr(e) = left {
        return e.eq(right);
    }
    let op = ctx.registry().lookup(OpKind::Binary, "eq")?;
    call_op(ctx, left, right, op, Role::Plain)
}

fn logical<'a>(
    ctx: &'a Context,
    left: Operand<'a>,
    right: Operand<'a>,
    name: &str,
    role: Role,
    restriction: &BoolOnly,
) -> Result<Expression<'a>> {
    let op = ctx.registry().lookup(OpKind::Binary, name)?;
    let e = call_op(ctx, left, right, op, role)?;
    restriction.check(e.dtype())?;
    Ok(e)
}

/// Logical xor over the union; boolean only
pub fn xor<'a>(
    ctx: &'a Context,
    left: impl Into<Operand<'a>>,
    right: impl Into<Operand<'a>>,
) -> Result<Expression<'a>> {
    logical(ctx, left.into(), right.into(), "lxor", Role::Outer, &XOR)
}

/// Reflected [`xor`]
pub fn rxor<'a>(
    ctx: &'a Context,
    left: impl Into<Operand<'a>>,
    right: impl Into<Operand<'a>>,
) -> Result<Expression<'a>> {
    xor(ctx, right, left)
}

/// In-place [`xor`]
pub fn ixor<'o, T: InPlace + ?Sized>(
    ctx: &Context,
    target: &mut T,
    other: impl Into<Operand<'o>>,
) -> Result<()> {
    let op = ctx.registry().lookup(OpKind::Binary, "lxor")?;
    in_place(ctx, target, other.into(), op, Role::Outer, "ixor", Some(&IXOR))
}

/// Logical or over the union; boolean only
pub fn or<'a>(
    ctx: &'a Context,
    left: impl Into<Operand<'a>>,
    right: impl Into<Operand<'a>>,
) -> Result<Expression<'a>> {
    logical(ctx, left.into(), right.into(), "lor", Role::Outer, &OR)
}

/// In-place [`or`]
pub fn ior<'o, T: InPlace + ?Sized>(
    ctx: &Context,
    target: &mut T,
    other: impl Into<Operand<'o>>,
) -> Result<()> {
    let op = ctx.registry().lookup(OpKind::Binary, "lor")?;
    in_place(ctx, target, other.into(), op, Role::Outer, "ior", Some(&IOR))
}

/// Logical and over the intersection; boolean only
pub fn and<'a>(
    ctx: &'a Context,
    left: impl Into<Operand<'a>>,
    right: impl Into<Operand<'a>>,
) -> Result<Expression<'a>> {
    logical(ctx, left.into(), right.into(), "land", Role::Plain, &AND)
}

/// In-place [`and`]
pub fn iand<'o, T: InPlace + ?Sized>(
    ctx: &Context,
    target: &mut T,
    other: impl Into<Operand<'o>>,
) -> Result<()> {
    let op = ctx.registry().lookup(OpKind::Binary, "land")?;
    in_place(ctx, target, other.into(), op, Role::Plain, "iand", Some(&IAND))
}

/// Additive inverse of every entry
pub fn neg<'a>(ctx: &'a Context, x: impl Into<Operand<'a>>) -> Result<Expression<'a>> {
    expr::apply(ctx, x.into(), ctx.registry().lookup(OpKind::Unary, "ainv")?)
}

/// Absolute value of every entry
pub fn abs<'a>(ctx: &'a Context, x: impl Into<Operand<'a>>) -> Result<Expression<'a>> {
    expr::apply(ctx, x.into(), ctx.registry().lookup(OpKind::Unary, "abs")?)
}

/// Logical not of every entry; boolean only
pub fn invert<'a>(ctx: &'a Context, x: impl Into<Operand<'a>>) -> Result<Expression<'a>> {
    let x = x.into();
    let dtype = x.dtype();
    if dtype != DType::Bool {
        return Err(Error::invalid_type(format!(
            "The invert operator, `~`, is not supported for {dtype} dtype.  It is only supported for BOOL dtype."
        )));
    }
    expr::apply(ctx, x, ctx.registry().lookup(OpKind::Unary, "lnot")?)
}

/// `(left // right, left % right)`
pub fn divmod<'a>(
    ctx: &'a Context,
    left: impl Into<Operand<'a>>,
    right: impl Into<Operand<'a>>,
) -> Result<(Expression<'a>, Expression<'a>)> {
    let (left, right) = (left.into(), right.into());
    Ok((floordiv(ctx, left, right)?, modulo(ctx, left, right)?))
}

/// Reflected [`divmod`]
pub fn rdivmod<'a>(
    ctx: &'a Context,
    left: impl Into<Operand<'a>>,
    right: impl Into<Operand<'a>>,
) -> Result<(Expression<'a>, Expression<'a>)> {
    divmod(ctx, right, left)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::Value;

    fn vec_i64(idx: &[u64], vals: &[i64]) -> Vector {
        Vector::from_coo(idx.iter().copied(), vals.iter().copied(), DType::I64, 4).unwrap()
    }

    #[test]
    fn test_roles_pick_combinators() {
        let ctx = Context::new().unwrap();
        let u = vec_i64(&[0, 1], &[1, 5]);
        let v = vec_i64(&[1], &[2]);
        assert_eq!(add(&ctx, &u, &v).unwrap().method_name(), "ewise_add");
        assert_eq!(sub(&ctx, &u, &v).unwrap().method_name(), "ewise_union");
        assert_eq!(mul(&ctx, &u, &v).unwrap().method_name(), "ewise_mult");
        assert_eq!(add(&ctx, &u, 1i64).unwrap().method_name(), "apply");
    }

    #[test]
    fn test_scalar_on_left_uses_commuted_op() {
        let ctx = Context::new().unwrap();
        let v = vec_i64(&[0, 2], &[1, 5]);
        let e = sub(&ctx, 10i64, &v).unwrap();
        assert_eq!(e.op().unwrap().name(), "rminus");
        let r = e.new().unwrap();
        assert_eq!(r.get(&[0]).unwrap(), Some(Value::Int(9)));
        assert_eq!(r.get(&[2]).unwrap(), Some(Value::Int(5)));
        // numpy.mod has no commuted partner, so the scalar is bound first
        let m = modulo(&ctx, 7i64, &v).unwrap();
        assert_eq!(m.op().unwrap().name(), "numpy.mod");
        assert_eq!(m.new().unwrap().get(&[2]).unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn test_union_subtraction_fills_with_zero() {
        let ctx = Context::new().unwrap();
        let u = vec_i64(&[0, 1], &[1, 5]);
        let v = vec_i64(&[1, 3], &[2, 4]);
        let r = sub(&ctx, &u, &v).unwrap().new().unwrap();
        let coo = r.to_coo();
        assert_eq!(coo.rows, vec![0, 1, 3]);
        assert_eq!(coo.values, vec![Value::Int(1), Value::Int(3), Value::Int(-4)]);
    }

    #[test]
    fn test_scalar_level_dispatch() {
        let ctx = Context::new().unwrap();
        let s = Scalar::from_value(3i64);
        let r = sub(&ctx, 10i64, &s).unwrap().new().unwrap();
        assert_eq!(r.as_i64().unwrap(), 7);
        let empty = Scalar::new(DType::I64);
        assert!(mul(&ctx, &s, &empty).unwrap().new().unwrap().is_empty());
        assert_eq!(add(&ctx, &s, &empty).unwrap().new().unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn test_bool_only_operators() {
        let ctx = Context::new().unwrap();
        let u = vec_i64(&[0], &[1]);
        let err = xor(&ctx, &u, &u).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The xor infix operator, `x ^ y`, is not supported for INT64 dtype.  It is only supported for BOOL dtype (and it uses ewise_add--the union)."
        );
        assert!(invert(&ctx, &u).unwrap_err().is_type_error());
        let b = Vector::from_coo([0, 1], [true, false], DType::Bool, 2).unwrap();
        let c = Vector::from_coo([1], [true], DType::Bool, 2).unwrap();
        let x = xor(&ctx, &b, &c).unwrap().new().unwrap();
        assert_eq!(x.get(&[1]).unwrap(), Some(Value::Bool(true)));
        let n = invert(&ctx, &b).unwrap().new().unwrap();
        assert_eq!(n.get(&[0]).unwrap(), Some(Value::Bool(false)));
        assert!(and(&ctx, &b, &c).is_ok());
    }

    #[test]
    fn test_in_place_accumulates_or_recomputes() {
        let ctx = Context::new().unwrap();
        let mut w = vec_i64(&[0, 1], &[1, 5]);
        let v = vec_i64(&[1, 2], &[2, 3]);
        iadd(&ctx, &mut w, &v).unwrap();
        assert_eq!(w.to_coo().0, vec![0, 1, 2]);
        assert_eq!(w.get(1), Some(Value::Int(7)));
        let name = w.name().to_string();
        imul(&ctx, &mut w, &v).unwrap();
        assert_eq!(w.to_coo().0, vec![1, 2]);
        assert_eq!(w.get(2), Some(Value::Int(9)));
        assert_eq!(w.name(), name);
        iadd(&ctx, &mut w, 1i64).unwrap();
        assert_eq!(w.get(1), Some(Value::Int(15)));
    }

    #[test]
    fn test_in_place_on_expression_is_refused() {
        let ctx = Context::new().unwrap();
        ctx.set_autocompute(true);
        let u = vec_i64(&[0], &[1]);
        let mut e = add(&ctx, &u, &u).unwrap();
        let err = iadd(&ctx, &mut e, 1i64).unwrap_err();
        assert!(matches!(err, Error::MaterializationRefused { ref attr, .. } if attr == "iadd"));
    }

    #[test]
    fn test_eq_refuses_deferred_left_operand() {
        let ctx = Context::new().unwrap();
        let u = vec_i64(&[0], &[1]);
        let e = add(&ctx, &u, &u).unwrap();
        assert!(matches!(eq(&ctx, &e, &u), Err(Error::EqualityRefused { .. })));
        let r = eq(&ctx, &u, &u).unwrap().new().unwrap();
        assert_eq!(r.dtype(), DType::Bool);
    }

    #[test]
    fn test_divmod() {
        let ctx = Context::new().unwrap();
        let u = vec_i64(&[0], &[7]);
        let (q, r) = divmod(&ctx, &u, 2i64).unwrap();
        assert_eq!(q.new().unwrap().get(&[0]).unwrap(), Some(Value::Int(3)));
        assert_eq!(r.new().unwrap().get(&[0]).unwrap(), Some(Value::Int(1)));
    }
}
