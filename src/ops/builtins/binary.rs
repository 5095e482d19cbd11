//! Builtin binary operators

use super::{binary_def, Out, ARITH, REAL};
use crate::dtype::{DType, DTypeSet, Value};
use crate::error::Result;
use crate::ops::definition::{Definition, OpDefinition};
use crate::ops::kernel::KernelHandle;
use crate::ops::kind::OpKind;
use crate::ops::param::ParamSignature;
use crate::ops::registry::Registry;
use num_integer::Integer;
use std::cmp::Ordering;

type BinaryFn = fn(Value, Value, DType) -> Value;

fn plus(x: Value, y: Value, _: DType) -> Value {
    match (x, y) {
        (Value::Bool(a), Value::Bool(b)) => Value::Bool(a | b),
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (Value::UInt(a), Value::UInt(b)) => Value::UInt(a.wrapping_add(b)),
        (Value::Complex(a), Value::Complex(b)) => Value::Complex(a + b),
        (a, b) => Value::Float(a.to_f64() + b.to_f64()),
    }
}

fn minus(x: Value, y: Value, _: DType) -> Value {
    match (x, y) {
        (Value::Bool(a), Value::Bool(b)) => Value::Bool(a ^ b),
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_sub(b)),
        (Value::UInt(a), Value::UInt(b)) => Value::UInt(a.wrapping_sub(b)),
        (Value::Complex(a), Value::Complex(b)) => Value::Complex(a - b),
        (a, b) => Value::Float(a.to_f64() - b.to_f64()),
    }
}

fn times(x: Value, y: Value, _: DType) -> Value {
    match (x, y) {
        (Value::Bool(a), Value::Bool(b)) => Value::Bool(a & b),
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_mul(b)),
        (Value::UInt(a), Value::UInt(b)) => Value::UInt(a.wrapping_mul(b)),
        (Value::Complex(a), Value::Complex(b)) => Value::Complex(a * b),
        (a, b) => Value::Float(a.to_f64() * b.to_f64()),
    }
}

/// Integer `x / 0`: zero stays zero, otherwise saturate toward the sign of `x`
fn int_div_by_zero(x: Value, dt: DType) -> Value {
    match x {
        Value::Int(0) | Value::UInt(0) => Value::zero(dt),
        Value::Int(a) if a < 0 => dt.lowest(),
        _ => dt.highest(),
    }
}

fn truediv(x: Value, y: Value, _: DType) -> Value {
    match (x, y) {
        (Value::Complex(a), Value::Complex(b)) => Value::Complex(a / b),
        (a, b) => Value::Float(a.to_f64() / b.to_f64()),
    }
}

/// Division truncating toward zero for integers
fn cdiv(x: Value, y: Value, dt: DType) -> Value {
    match (x, y) {
        (Value::Bool(a), Value::Bool(_)) => Value::Bool(a),
        (a, Value::Int(0) | Value::UInt(0)) => int_div_by_zero(a, dt),
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_div(b)),
        (Value::UInt(a), Value::UInt(b)) => Value::UInt(a / b),
        (a, b) => truediv(a, b, dt),
    }
}

fn floordiv(x: Value, y: Value, dt: DType) -> Value {
    match (x, y) {
        (Value::Bool(a), Value::Bool(_)) => Value::Bool(a),
        (a, Value::Int(0) | Value::UInt(0)) => int_div_by_zero(a, dt),
        (Value::Int(a), Value::Int(-1)) => Value::Int(a.wrapping_neg()),
        (Value::Int(a), Value::Int(b)) => Value::Int(Integer::div_floor(&a, &b)),
        (Value::UInt(a), Value::UInt(b)) => Value::UInt(a / b),
        (a, b) => Value::Float((a.to_f64() / b.to_f64()).floor()),
    }
}

/// Remainder with the sign of the divisor; `x % 0 == 0` for integers
fn modulo(x: Value, y: Value, dt: DType) -> Value {
    match (x, y) {
        (_, Value::Int(0) | Value::UInt(0)) => Value::zero(dt),
        (Value::Int(_), Value::Int(-1)) => Value::Int(0),
        (Value::Int(a), Value::Int(b)) => Value::Int(Integer::mod_floor(&a, &b)),
        (Value::UInt(a), Value::UInt(b)) => Value::UInt(a % b),
        (Value::Bool(_), Value::Bool(_)) => Value::Bool(false),
        (a, b) => {
            let (a, b) = (a.to_f64(), b.to_f64());
            Value::Float(a - b * (a / b).floor())
        }
    }
}

fn pow(x: Value, y: Value, _: DType) -> Value {
    match (x, y) {
        (Value::Bool(a), Value::Bool(b)) => Value::Bool(a | !b),
        (Value::Complex(a), Value::Complex(b)) => Value::Complex(a.powc(b)),
        (a, b) => Value::Float(a.to_f64().powf(b.to_f64())),
    }
}

fn first(x: Value, _: Value, _: DType) -> Value {
    x
}

fn second(_: Value, y: Value, _: DType) -> Value {
    y
}

fn pair(_: Value, _: Value, dt: DType) -> Value {
    Value::one(dt)
}

fn ordering(x: Value, y: Value) -> Option<Ordering> {
    match (x, y) {
        (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(&b),
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(&b),
        (Value::UInt(a), Value::UInt(b)) => a.partial_cmp(&b),
        (Value::Complex(a), Value::Complex(b)) if a == b => Some(Ordering::Equal),
        (Value::Complex(_), Value::Complex(_)) => None,
        (a, b) => a.to_f64().partial_cmp(&b.to_f64()),
    }
}

fn min(x: Value, y: Value, _: DType) -> Value {
    match (x, y) {
        (Value::Float(a), Value::Float(b)) => Value::Float(a.min(b)),
        (a, b) if ordering(a, b) == Some(Ordering::Greater) => b,
        (a, _) => a,
    }
}

fn max(x: Value, y: Value, _: DType) -> Value {
    match (x, y) {
        (Value::Float(a), Value::Float(b)) => Value::Float(a.max(b)),
        (a, b) if ordering(a, b) == Some(Ordering::Less) => b,
        (a, _) => a,
    }
}

fn eq(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(ordering(x, y) == Some(Ordering::Equal))
}

fn ne(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(ordering(x, y) != Some(Ordering::Equal))
}

fn lt(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(ordering(x, y) == Some(Ordering::Less))
}

fn le(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(matches!(ordering(x, y), Some(Ordering::Less | Ordering::Equal)))
}

fn gt(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(ordering(x, y) == Some(Ordering::Greater))
}

fn ge(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(matches!(ordering(x, y), Some(Ordering::Greater | Ordering::Equal)))
}

fn lor(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(x.truthy() || y.truthy())
}

fn land(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(x.truthy() && y.truthy())
}

fn lxor(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(x.truthy() ^ y.truthy())
}

fn lxnor(x: Value, y: Value, _: DType) -> Value {
    Value::Bool(x.truthy() == y.truthy())
}

fn atan2(x: Value, y: Value, _: DType) -> Value {
    Value::Float(x.to_f64().atan2(y.to_f64()))
}

fn bitwise(x: Value, y: Value, op: fn(u64, u64) -> u64) -> Value {
    match (x, y) {
        (Value::Int(a), Value::Int(b)) => Value::Int(op(a as u64, b as u64) as i64),
        (Value::UInt(a), Value::UInt(b)) => Value::UInt(op(a, b)),
        (a, _) => a,
    }
}

fn bor(x: Value, y: Value, _: DType) -> Value {
    bitwise(x, y, |a, b| a | b)
}

fn band(x: Value, y: Value, _: DType) -> Value {
    bitwise(x, y, |a, b| a & b)
}

fn bxor(x: Value, y: Value, _: DType) -> Value {
    bitwise(x, y, |a, b| a ^ b)
}

fn isclose_def(params: &[Value]) -> Result<OpDefinition> {
    let rel_tol = params.first().map_or(1e-7, Value::to_f64);
    let abs_tol = params.get(1).map_or(0.0, Value::to_f64);
    if rel_tol < 0.0 || abs_tol < 0.0 {
        return Err(crate::error::Error::invalid_value(
            "tolerances must be non-negative",
        ));
    }
    let dtypes = ARITH;
    Ok(dtypes.iter().fold(OpDefinition::new(), |def, dt| {
        def.kernel(KernelHandle::binary(
            format!("isclose_{dt}"),
            dt,
            DType::Bool,
            move |x, y| {
                if x == y {
                    return Value::Bool(true);
                }
                let diff = (x.to_complex() - y.to_complex()).magnitude();
                let scale = x.to_complex().magnitude().max(y.to_complex().magnitude());
                Value::Bool(diff <= (rel_tol * scale).max(abs_tol))
            },
        ))
    }))
}

fn positional(name: &str, f: fn(u64, u64, u64, u64) -> u64) -> OpDefinition {
    [DType::I32, DType::I64]
        .into_iter()
        .fold(OpDefinition::new().positional(), |def, dt| {
            def.kernel(KernelHandle::positional(format!("{name}_{dt}"), dt, move |px, py| {
                Value::Int(f(px.row, px.col, py.row, py.col) as i64)
            }))
        })
}

pub(super) fn install(reg: &Registry) -> Result<()> {
    let numeric_or_bool = REAL;
    let table: [(&str, DTypeSet, Out, BinaryFn); 28] = [
        ("plus", ARITH, Out::Same, plus),
        ("minus", ARITH, Out::Same, minus),
        ("rminus", ARITH, Out::Same, |x, y, dt| minus(y, x, dt)),
        ("times", ARITH, Out::Same, times),
        ("truediv", ARITH, Out::Float, truediv),
        ("rtruediv", ARITH, Out::Float, |x, y, dt| truediv(y, x, dt)),
        ("cdiv", ARITH, Out::Same, cdiv),
        ("floordiv", numeric_or_bool, Out::Same, floordiv),
        ("rfloordiv", numeric_or_bool, Out::Same, |x, y, dt| floordiv(y, x, dt)),
        ("pow", ARITH, Out::Same, pow),
        ("rpow", ARITH, Out::Same, |x, y, dt| pow(y, x, dt)),
        ("first", ARITH, Out::Same, first),
        ("second", ARITH, Out::Same, second),
        ("pair", ARITH, Out::Same, pair),
        ("any", ARITH, Out::Same, first),
        ("min", numeric_or_bool, Out::Same, min),
        ("max", numeric_or_bool, Out::Same, max),
        ("eq", ARITH, Out::Bool, eq),
        ("ne", ARITH, Out::Bool, ne),
        ("lt", numeric_or_bool, Out::Bool, lt),
        ("le", numeric_or_bool, Out::Bool, le),
        ("gt", numeric_or_bool, Out::Bool, gt),
        ("ge", numeric_or_bool, Out::Bool, ge),
        ("lor", numeric_or_bool, Out::Same, lor),
        ("land", numeric_or_bool, Out::Same, land),
        ("lxor", numeric_or_bool, Out::Same, lxor),
        ("lxnor", numeric_or_bool, Out::Same, lxnor),
        ("atan2", DTypeSet::FLOATS, Out::Same, atan2),
    ];
    for (name, dtypes, out, f) in table {
        reg.register(name, Definition::Binary(binary_def(name, dtypes, out, f)))?;
    }
    for (name, f) in [("bor", bor as BinaryFn), ("band", band), ("bxor", bxor)] {
        reg.register(name, Definition::Binary(binary_def(name, DTypeSet::INTS, Out::Same, f)))?;
    }
    reg.register(
        "numpy.mod",
        Definition::Binary(binary_def("mod", numeric_or_bool, Out::Same, modulo)),
    )?;
    reg.register(
        "isclose",
        Definition::parameterized(
            OpKind::Binary,
            ParamSignature::new()
                .optional("rel_tol", 1e-7)
                .optional("abs_tol", 0.0),
            isclose_def,
        ),
    )?;
    reg.register("firsti", Definition::Binary(positional("firsti", |i, _, _, _| i)))?;
    reg.register("firstj", Definition::Binary(positional("firstj", |_, j, _, _| j)))?;
    reg.register("secondi", Definition::Binary(positional("secondi", |_, _, i, _| i)))?;
    reg.register("secondj", Definition::Binary(positional("secondj", |_, _, _, j| j)))?;

    let id = |name: &str| reg.lookup(OpKind::Binary, name);
    for name in [
        "plus", "times", "pair", "any", "min", "max", "eq", "ne", "lor", "land", "lxor", "lxnor",
        "bor", "band", "bxor", "isclose",
    ] {
        let op = id(name)?;
        reg.link_commute(op, op)?;
    }
    for (a, b) in [
        ("first", "second"),
        ("minus", "rminus"),
        ("truediv", "rtruediv"),
        ("floordiv", "rfloordiv"),
        ("pow", "rpow"),
        ("lt", "gt"),
        ("le", "ge"),
        ("firsti", "secondi"),
        ("firstj", "secondj"),
    ] {
        reg.link_commute(id(a)?, id(b)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_division_rules() {
        assert_eq!(floordiv(Value::Int(-7), Value::Int(2), DType::I64), Value::Int(-4));
        assert_eq!(cdiv(Value::Int(-7), Value::Int(2), DType::I64), Value::Int(-3));
        assert_eq!(cdiv(Value::Int(5), Value::Int(0), DType::I8), Value::Int(127));
        assert_eq!(cdiv(Value::Int(-5), Value::Int(0), DType::I8), Value::Int(-128));
        assert_eq!(cdiv(Value::Int(0), Value::Int(0), DType::I8), Value::Int(0));
    }

    #[test]
    fn test_modulo_sign_follows_divisor() {
        assert_eq!(modulo(Value::Int(-7), Value::Int(3), DType::I64), Value::Int(2));
        assert_eq!(modulo(Value::Int(7), Value::Int(-3), DType::I64), Value::Int(-2));
        assert_eq!(modulo(Value::Float(-1.0), Value::Float(3.0), DType::F64), Value::Float(2.0));
    }

    #[test]
    fn test_min_max_ignore_nan() {
        assert_eq!(min(Value::Float(f64::NAN), Value::Float(1.0), DType::F64), Value::Float(1.0));
        assert_eq!(max(Value::Int(3), Value::Int(9), DType::I64), Value::Int(9));
    }

    #[test]
    fn test_truediv_of_ints_is_float() {
        let reg = Registry::with_builtins().unwrap();
        let op = reg.lookup(OpKind::Binary, "truediv").unwrap();
        let typed = reg.resolve(op, &[DType::I64]).unwrap();
        assert_eq!(typed.return_type(), DType::F64);
    }

    #[test]
    fn test_commute_pairs() {
        let reg = Registry::with_builtins().unwrap();
        let id = |n| reg.lookup(OpKind::Binary, n).unwrap();
        assert_eq!(reg.commutes_to(id("first")).unwrap(), Some(id("second")));
        assert_eq!(reg.commutes_to(id("plus")).unwrap(), Some(id("plus")));
        assert_eq!(reg.commutes_to(id("atan2")).unwrap(), None);
        assert_eq!(reg.commutes_to(id("numpy.mod")).unwrap(), None);
    }
}
