//! Builtin monoids and semirings

use crate::dtype::{DType, DTypeSet, Value};
use crate::error::{Error, Result};
use crate::ops::definition::{Definition, Identity};
use crate::ops::kind::OpKind;
use crate::ops::registry::Registry;

/// Identity of `band`: every bit set
fn all_ones(dt: DType) -> Value {
    if dt.is_signed_int() {
        Value::Int(-1)
    } else {
        dt.highest()
    }
}

fn per_type(dtypes: DTypeSet, f: impl Fn(DType) -> Value) -> Identity {
    Identity::PerType(dtypes.iter().map(|dt| (dt, f(dt))).collect())
}

pub(super) fn install(reg: &Registry) -> Result<()> {
    let numeric = DTypeSet::NUMERIC;
    let arith = numeric.union(DTypeSet::COMPLEX);
    let bool_only = DTypeSet::BOOL;
    let monoids: [(&str, Identity, bool); 13] = [
        ("plus", per_type(arith, Value::zero), false),
        ("times", per_type(arith, Value::one), false),
        ("min", per_type(numeric, DType::highest), true),
        ("max", per_type(numeric, DType::lowest), true),
        ("any", per_type(DTypeSet::ALL, Value::zero), true),
        ("lor", per_type(bool_only, |_| Value::Bool(false)), true),
        ("land", per_type(bool_only, |_| Value::Bool(true)), true),
        ("lxor", per_type(bool_only, |_| Value::Bool(false)), false),
        ("lxnor", per_type(bool_only, |_| Value::Bool(true)), false),
        ("eq", per_type(bool_only, |_| Value::Bool(true)), false),
        ("bor", per_type(DTypeSet::INTS, Value::zero), true),
        ("band", per_type(DTypeSet::INTS, all_ones), true),
        ("bxor", per_type(DTypeSet::INTS, Value::zero), false),
    ];
    for (name, identity, idempotent) in monoids {
        let binaryop = reg.lookup(OpKind::Binary, name)?;
        reg.register(
            name,
            Definition::Monoid {
                binaryop,
                identity,
                idempotent,
            },
        )?;
    }
    Ok(())
}

const SEMIRING_MONOIDS: [&str; 9] = ["plus", "times", "min", "max", "any", "lor", "land", "lxor", "eq"];

const SEMIRING_BINARIES: [&str; 30] = [
    "plus", "minus", "rminus", "times", "truediv", "rtruediv", "cdiv", "floordiv", "rfloordiv",
    "pow", "rpow", "first", "second", "pair", "any", "min", "max", "eq", "ne", "lt", "le", "gt",
    "ge", "lor", "land", "lxor", "firsti", "firstj", "secondi", "secondj",
];

/// Register `{monoid}_{binary}` for every product with a non-empty domain
pub(super) fn install_semirings(reg: &Registry) -> Result<()> {
    let mut skipped = 0usize;
    for m in SEMIRING_MONOIDS {
        let monoid = reg.lookup(OpKind::Monoid, m)?;
        for b in SEMIRING_BINARIES {
            let binaryop = reg.lookup(OpKind::Binary, b)?;
            match reg.register(&format!("{m}_{b}"), Definition::Semiring { monoid, binaryop }) {
                Ok(_) => {}
                Err(Error::DomainMismatch { .. }) => skipped += 1,
                Err(e) => return Err(e),
            }
        }
    }
    log::trace!("skipped {skipped} semirings with an empty domain");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::kind::TypeKey;

    #[test]
    fn test_binary_monoid_links() {
        let reg = Registry::with_builtins().unwrap();
        let plus = reg.lookup(OpKind::Binary, "plus").unwrap();
        let mplus = reg.lookup(OpKind::Monoid, "plus").unwrap();
        assert_eq!(reg.monoid_of(plus).unwrap(), Some(mplus));
        assert_eq!(reg.binaryop_of(mplus).unwrap(), Some(plus));

        let typed = reg.resolve(plus, &[DType::Bool]).unwrap();
        assert!(typed.monoid(&reg).unwrap().is_none());
        let typed = reg.resolve(plus, &[DType::I32]).unwrap();
        let m = typed.monoid(&reg).unwrap().unwrap();
        assert_eq!(m.identity(), Some(Value::Int(0)));
    }

    #[test]
    fn test_identities() {
        let reg = Registry::with_builtins().unwrap();
        let min = reg.lookup(OpKind::Monoid, "min").unwrap();
        let ids = reg.identities(min).unwrap();
        assert_eq!(ids[&DType::U8], Value::UInt(255));
        assert_eq!(ids[&DType::F32], Value::Float(f64::INFINITY));
        let band = reg.lookup(OpKind::Monoid, "band").unwrap();
        assert_eq!(reg.identities(band).unwrap()[&DType::I16], Value::Int(-1));
        assert!(reg.info(min).unwrap().is_idempotent);
        assert!(reg.info(min).unwrap().is_commutative());
    }

    #[test]
    fn test_semiring_domains_and_commutes() {
        let reg = Registry::with_builtins().unwrap();
        let plus_times = reg.lookup(OpKind::Semiring, "plus_times").unwrap();
        assert!(reg.info(plus_times).unwrap().is_commutative());
        let min_first = reg.lookup(OpKind::Semiring, "min_first").unwrap();
        let min_second = reg.lookup(OpKind::Semiring, "min_second").unwrap();
        assert_eq!(reg.commutes_to(min_first).unwrap(), Some(min_second));
        // lt produces BOOL, which plus does not support
        assert!(reg.lookup(OpKind::Semiring, "plus_lt").is_err());

        let typed = reg.resolve(plus_times, &[DType::F64]).unwrap();
        let add = typed.add().unwrap();
        assert_eq!(add.identity, Value::Float(0.0));
        assert_eq!(typed.type_key(), TypeKey::Single(DType::F64));
    }
}
