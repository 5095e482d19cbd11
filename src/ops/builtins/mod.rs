//! Builtin operator catalog
//!
//! Mirrors the standard GraphBLAS operator set. Kernels operate on [`Value`]s
//! that were already cast to the kernel's input type, so each function only
//! has to handle one family per call.

mod binary;
mod index_unary;
mod monoid;
mod unary;

use super::definition::OpDefinition;
use super::kernel::KernelHandle;
use super::registry::Registry;
use crate::dtype::{DType, DTypeSet, Value};
use crate::error::Result;

/// Install every builtin operator into `registry`
pub(crate) fn install(registry: &Registry) -> Result<()> {
    unary::install(registry)?;
    binary::install(registry)?;
    monoid::install(registry)?;
    monoid::install_semirings(registry)?;
    index_unary::install(registry)?;
    log::debug!("installed {} builtin operators", registry.len());
    Ok(())
}

/// Output type rule for a family of kernels
#[derive(Copy, Clone, Debug)]
pub(super) enum Out {
    /// Same as the input
    Same,
    /// Always BOOL
    Bool,
    /// FP64 for booleans and integers, the input type otherwise
    Float,
}

impl Out {
    fn for_input(self, dt: DType) -> DType {
        match self {
            Out::Same => dt,
            Out::Bool => DType::Bool,
            Out::Float if dt.is_float() || dt.is_complex() => dt,
            Out::Float => DType::F64,
        }
    }
}

/// Element types every arithmetic builtin is declared for
pub(super) const ARITH: DTypeSet = DTypeSet::ALL;
/// Real element types (no complex)
pub(super) const REAL: DTypeSet = DTypeSet::ALL.difference(DTypeSet::COMPLEX);

pub(super) fn unary_def(
    name: &str,
    dtypes: DTypeSet,
    out: Out,
    f: fn(Value, DType) -> Value,
) -> OpDefinition {
    dtypes.iter().fold(OpDefinition::new(), |def, dt| {
        def.kernel(KernelHandle::unary(
            format!("{name}_{dt}"),
            dt,
            out.for_input(dt),
            move |x| f(x, dt),
        ))
    })
}

pub(super) fn binary_def(
    name: &str,
    dtypes: DTypeSet,
    out: Out,
    f: fn(Value, Value, DType) -> Value,
) -> OpDefinition {
    dtypes.iter().fold(OpDefinition::new(), |def, dt| {
        def.kernel(KernelHandle::binary(
            format!("{name}_{dt}"),
            dt,
            out.for_input(dt),
            move |x, y| f(x, y, dt),
        ))
    })
}

/// Integer view of a thunk value
pub(super) fn thunk_i64(thunk: Value) -> i64 {
    match thunk.cast(DType::I64) {
        Value::Int(i) => i,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::kind::OpKind;

    #[test]
    fn test_catalog_installs() {
        let reg = Registry::with_builtins().unwrap();
        for name in ["identity", "ainv", "abs", "minv", "lnot", "one", "bnot"] {
            assert!(reg.lookup(OpKind::Unary, name).is_ok(), "unary.{name}");
        }
        for name in ["plus", "numpy.mod", "isclose", "firsti", "atan2", "lxnor"] {
            assert!(reg.lookup(OpKind::Binary, name).is_ok(), "binary.{name}");
        }
        for name in ["plus_times", "min_plus", "any_pair", "lor_land", "min_firsti"] {
            assert!(reg.lookup(OpKind::Semiring, name).is_ok(), "semiring.{name}");
        }
        for name in ["tril", "rowindex", "valuegt"] {
            assert!(reg.lookup(OpKind::IndexUnary, name).is_ok(), "indexunary.{name}");
        }
        assert!(reg.lookup(OpKind::Select, "tril").is_ok());
        assert!(reg.lookup(OpKind::Select, "rowindex").is_err());
    }

    #[test]
    fn test_out_rule() {
        assert_eq!(Out::Float.for_input(DType::I32), DType::F64);
        assert_eq!(Out::Float.for_input(DType::F32), DType::F32);
        assert_eq!(Out::Bool.for_input(DType::U8), DType::Bool);
    }
}
