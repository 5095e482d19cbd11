//! Registry behavior visible through the public API

use graphalg::dtype::{can_cast_safely, DTypeSet};
use graphalg::ops::{Definition, OpDefinition, ReturnType, TypeKey};
use graphalg::prelude::*;
use proptest::prelude::*;

#[test]
fn test_commute_links_are_symmetric() {
    let reg = Registry::with_builtins().unwrap();
    for (kind, names) in [
        (OpKind::Binary, vec!["minus", "truediv", "lt", "le", "first", "plus"]),
        (OpKind::Semiring, vec!["plus_times", "min_first", "any_secondi"]),
    ] {
        for name in names {
            let id = reg.lookup(kind, name).unwrap();
            if let Some(c) = reg.commutes_to(id).unwrap() {
                assert_eq!(reg.commutes_to(c).unwrap(), Some(id), "{name}");
            }
        }
    }
    let lt = reg.lookup(OpKind::Binary, "lt").unwrap();
    let gt = reg.lookup(OpKind::Binary, "gt").unwrap();
    assert_eq!(reg.commutes_to(lt).unwrap(), Some(gt));
}

#[test]
fn test_resolution_coerces_to_smallest_safe_type() {
    let reg = Registry::with_builtins().unwrap();
    let truediv = reg.lookup(OpKind::Binary, "truediv").unwrap();
    let t = reg.resolve(truediv, &[DType::I32, DType::I32]).unwrap();
    assert_eq!(t.return_type(), DType::F64);

    let plus = reg.lookup(OpKind::Binary, "plus").unwrap();
    let mixed = reg.resolve(plus, &[DType::I32, DType::F64]).unwrap();
    assert_eq!(mixed.type_key(), TypeKey::Single(DType::F64));
    let again = reg.resolve(plus, &[DType::I32, DType::F64]).unwrap();
    assert_eq!(mixed.kernel(), again.kernel());
}

fn dtype_strategy() -> impl Strategy<Value = DType> {
    prop::sample::select(DType::ALL.to_vec())
}

proptest! {
    /// Repeated resolution picks the same kernel, and coercion only widens
    #[test]
    fn resolution_is_deterministic(left in dtype_strategy(), right in dtype_strategy()) {
        let reg = Registry::with_builtins().unwrap();
        for name in ["plus", "lt"] {
            let id = reg.lookup(OpKind::Binary, name).unwrap();
            match reg.resolve(id, &[left, right]) {
                Ok(t) => {
                    let again = reg.resolve(id, &[left, right]).unwrap();
                    prop_assert!(t.kernel() == again.kernel());
                    prop_assert_eq!(t.type_key(), again.type_key());
                    let key = t.type_key();
                    if t.is_coerced() {
                        prop_assert!(can_cast_safely(left, key.left()), "{name}: {left} -> {key}");
                        prop_assert!(can_cast_safely(right, key.right()), "{name}: {right} -> {key}");
                    } else {
                        prop_assert_eq!(key, t.requested());
                    }
                }
                Err(err) => prop_assert!(matches!(err, Error::NoMatchingKernel { .. }), "{}", err),
            }
        }
    }
}

fn absdiff() -> OpDefinition {
    OpDefinition::binary_udf("absdiff", DTypeSet::INTS, ReturnType::SameAsInput, |x, y| {
        match (x, y) {
            (Value::Int(a), Value::Int(b)) => Value::Int((a - b).abs()),
            (a, b) => Value::Float((a.to_f64() - b.to_f64()).abs()),
        }
    })
    .unwrap()
}

#[test]
fn test_user_defined_operator_round_trip() {
    let ctx = Context::new().unwrap();
    let def = absdiff();
    let id = ctx.registry().register("user.absdiff", Definition::Binary(def)).unwrap();
    assert_eq!(ctx.registry().lookup(OpKind::Binary, "user.absdiff").unwrap(), id);
    assert!(ctx.registry().is_namespace(OpKind::Binary, "user"));

    let err = ctx
        .registry()
        .register("user", Definition::Binary(absdiff()))
        .unwrap_err();
    assert!(matches!(err, Error::PathConflict { .. }), "{err}");

    let err = ctx
        .registry()
        .register("user.absdiff", Definition::Binary(absdiff()))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateName { .. }), "{err}");
    assert_eq!(ctx.registry().lookup(OpKind::Binary, "user.absdiff").unwrap(), id);

    let u = Vector::from_coo([0, 1], [3i64, 1], DType::I64, 2).unwrap();
    let v = Vector::from_coo([0, 1], [1i64, 4], DType::I64, 2).unwrap();
    let w = u.ewise_mult(&ctx, &v, id).unwrap().new().unwrap();
    assert_eq!(w.get(&[0]).unwrap(), Some(Value::Int(2)));
    assert_eq!(w.get(&[1]).unwrap(), Some(Value::Int(3)));
}

#[test]
fn test_unknown_operator_and_wrong_kind() {
    let ctx = Context::new().unwrap();
    assert!(matches!(ctx.binary("no_such_op"), Err(Error::UnknownOperator { .. })));

    let u = Vector::from_coo([0], [1i64], DType::I64, 1).unwrap();
    let semiring = ctx.semiring("plus_times").unwrap();
    let err = u.ewise_add(&ctx, &u, semiring).unwrap_err();
    assert!(err.is_type_error(), "{err}");
}

#[test]
fn test_semiring_created_on_demand() {
    let reg = Registry::with_builtins().unwrap();
    let max = reg.lookup(OpKind::Monoid, "max").unwrap();
    let minus = reg.lookup(OpKind::Binary, "minus").unwrap();
    let s = reg.get_semiring(max, minus).unwrap();
    assert_eq!(reg.get_semiring(max, minus).unwrap(), s);
    assert_eq!(reg.kind(s).unwrap(), OpKind::Semiring);
}
