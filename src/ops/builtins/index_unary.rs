//! Builtin index-unary and select operators

use super::{thunk_i64, REAL};
use crate::dtype::{DType, DTypeSet, Value};
use crate::error::Result;
use crate::ops::definition::{Definition, OpDefinition};
use crate::ops::kernel::{KernelHandle, Position};
use crate::ops::registry::Registry;
use std::cmp::Ordering;

type PositionFn = fn(i64, i64, i64) -> Value;

fn positional(name: &str, output: DType, f: PositionFn) -> OpDefinition {
    DTypeSet::ALL
        .iter()
        .fold(OpDefinition::new().positional(), |def, dt| {
            def.kernel(KernelHandle::index_unary(
                format!("{name}_{dt}"),
                dt,
                output,
                move |_, pos: Position, thunk| f(pos.row as i64, pos.col as i64, thunk_i64(thunk)),
            ))
        })
}

fn compare_thunk(name: &str, dtypes: DTypeSet, accept: fn(Option<Ordering>) -> bool) -> OpDefinition {
    dtypes.iter().fold(OpDefinition::new(), |def, dt| {
        def.kernel(KernelHandle::index_unary(
            format!("{name}_{dt}"),
            dt,
            DType::Bool,
            move |x, _, thunk| {
                let y = thunk.cast(dt);
                let ord = if dt.is_complex() {
                    (x == y).then_some(Ordering::Equal)
                } else if dt.is_float() {
                    x.to_f64().partial_cmp(&y.to_f64())
                } else {
                    match (x, y) {
                        (Value::Int(a), Value::Int(b)) => Some(a.cmp(&b)),
                        (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(&b)),
                        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(&b)),
                        _ => None,
                    }
                };
                Value::Bool(accept(ord))
            },
        ))
    })
}

fn predicates() -> Vec<(&'static str, OpDefinition)> {
    let eq = |o: Option<Ordering>| o == Some(Ordering::Equal);
    vec![
        ("tril", positional("tril", DType::Bool, |i, j, k| Value::Bool(j <= i + k))),
        ("triu", positional("triu", DType::Bool, |i, j, k| Value::Bool(j >= i + k))),
        ("diag", positional("diag", DType::Bool, |i, j, k| Value::Bool(j == i + k))),
        ("offdiag", positional("offdiag", DType::Bool, |i, j, k| Value::Bool(j != i + k))),
        ("rowle", positional("rowle", DType::Bool, |i, _, k| Value::Bool(i <= k))),
        ("rowgt", positional("rowgt", DType::Bool, |i, _, k| Value::Bool(i > k))),
        ("colle", positional("colle", DType::Bool, |_, j, k| Value::Bool(j <= k))),
        ("colgt", positional("colgt", DType::Bool, |_, j, k| Value::Bool(j > k))),
        ("valueeq", compare_thunk("valueeq", DTypeSet::ALL, eq)),
        ("valuene", compare_thunk("valuene", DTypeSet::ALL, |o| o != Some(Ordering::Equal))),
        ("valuelt", compare_thunk("valuelt", REAL, |o| o == Some(Ordering::Less))),
        ("valuele", compare_thunk("valuele", REAL, |o| {
            matches!(o, Some(Ordering::Less | Ordering::Equal))
        })),
        ("valuegt", compare_thunk("valuegt", REAL, |o| o == Some(Ordering::Greater))),
        ("valuege", compare_thunk("valuege", REAL, |o| {
            matches!(o, Some(Ordering::Greater | Ordering::Equal))
        })),
    ]
}

pub(super) fn install(reg: &Registry) -> Result<()> {
    let index_only = [
        ("rowindex", positional("rowindex", DType::I64, |i, _, k| Value::Int(i + k))),
        ("colindex", positional("colindex", DType::I64, |_, j, k| Value::Int(j + k))),
        ("diagindex", positional("diagindex", DType::I64, |i, j, k| Value::Int(j - i + k))),
    ];
    for (name, def) in index_only {
        reg.register(name, Definition::IndexUnary(def))?;
    }
    // Select operators share the boolean index-unary kernels
    for (name, def) in predicates() {
        reg.register(name, Definition::IndexUnary(def.clone()))?;
        reg.register(name, Definition::Select(def))?;
    }
    Ok(())
}
