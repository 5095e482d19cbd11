//! Builtin unary operators

use super::{unary_def, Out, ARITH, REAL};
use crate::dtype::{DType, DTypeSet, Value};
use crate::error::Result;
use crate::ops::definition::Definition;
use crate::ops::registry::Registry;

fn identity(x: Value, _: DType) -> Value {
    x
}

fn ainv(x: Value, _: DType) -> Value {
    match x {
        Value::Bool(b) => Value::Bool(b),
        Value::Int(i) => Value::Int(i.wrapping_neg()),
        Value::UInt(u) => Value::UInt(u.wrapping_neg()),
        Value::Float(f) => Value::Float(-f),
        Value::Complex(c) => Value::Complex(-c),
    }
}

fn abs(x: Value, _: DType) -> Value {
    match x {
        Value::Int(i) => Value::Int(i.wrapping_abs()),
        Value::Float(f) => Value::Float(f.abs()),
        other => other,
    }
}

/// `1/x`; integer division rounds toward zero and `1/0` saturates
fn minv(x: Value, dt: DType) -> Value {
    match x {
        Value::Bool(_) => Value::Bool(true),
        Value::Int(0) | Value::UInt(0) => dt.highest(),
        Value::Int(i) => Value::Int(1 / i),
        Value::UInt(u) => Value::UInt(1 / u),
        Value::Float(f) => Value::Float(1.0 / f),
        Value::Complex(c) => Value::Complex(c.recip()),
    }
}

fn lnot(x: Value, _: DType) -> Value {
    Value::Bool(!x.truthy())
}

fn one(_: Value, dt: DType) -> Value {
    Value::one(dt)
}

fn bnot(x: Value, _: DType) -> Value {
    match x {
        Value::Int(i) => Value::Int(!i),
        Value::UInt(u) => Value::UInt(!u),
        other => other,
    }
}

pub(super) fn install(reg: &Registry) -> Result<()> {
    let table: [(&str, DTypeSet, fn(Value, DType) -> Value); 7] = [
        ("identity", ARITH, identity),
        ("ainv", ARITH, ainv),
        ("abs", REAL, abs),
        ("minv", ARITH, minv),
        ("lnot", REAL, lnot),
        ("one", ARITH, one),
        ("bnot", DTypeSet::INTS, bnot),
    ];
    for (name, dtypes, f) in table {
        reg.register(name, Definition::Unary(unary_def(name, dtypes, Out::Same, f)))?;
    }
    Ok(())
}
