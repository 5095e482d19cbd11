//! Parameterized operators, their monoids, and curried instances

mod common;

use common::{create_context, int_vector};
use graphalg::dtype::DTypeSet;
use graphalg::ops::{Definition, Identity, OpDefinition, ParamSignature, Params, ReturnType};
use graphalg::prelude::*;

fn modplus(bound: &[Value]) -> Result<OpDefinition> {
    let m = bound[0].try_to_i64()?;
    if m <= 0 {
        return Err(Error::invalid_value(format!("modulus must be positive, got {m}")));
    }
    OpDefinition::binary_udf(
        "modplus",
        DTypeSet::single(DType::I64),
        ReturnType::SameAsInput,
        move |x, y| match (x, y) {
            (Value::Int(a), Value::Int(b)) => Value::Int((a + b).rem_euclid(m)),
            (a, _) => a,
        },
    )
}

fn register_modplus(reg: &Registry, name: &str) -> OpId {
    reg.register(
        name,
        Definition::parameterized(OpKind::Binary, ParamSignature::new().required("m"), modplus),
    )
    .unwrap()
}

#[test]
fn test_curry_is_memoized_per_parameters() {
    let ctx = create_context();
    let reg = ctx.registry();
    let b = register_modplus(reg, "modplus");
    let five = reg.curry(b, &Params::new().arg(5i64)).unwrap();
    assert_eq!(reg.curry(b, &Params::new().kw("m", 5i64)).unwrap(), five);
    let seven = reg.curry(b, &Params::new().arg(7i64)).unwrap();
    assert_ne!(five, seven);

    let info = reg.info(five).unwrap();
    assert_eq!(info.parent, Some(b));
    assert_eq!(info.name, "modplus(m=5)");

    assert!(reg.curry(b, &Params::new().arg(0i64)).unwrap_err().is_value_error());
    assert!(reg.curry(b, &Params::new()).is_err());
}

#[test]
fn test_monoid_instances_are_isolated() {
    let ctx = create_context();
    let reg = ctx.registry();
    let b = register_modplus(reg, "modplus");
    let m = reg
        .register(
            "modplus",
            Definition::Monoid {
                binaryop: b,
                identity: Identity::Value(Value::Int(0)),
                idempotent: false,
            },
        )
        .unwrap();
    assert_eq!(reg.monoid_of(b).unwrap(), Some(m));

    let five = reg.curry(b, &Params::new().arg(5i64)).unwrap();
    let seven = reg.curry(b, &Params::new().arg(7i64)).unwrap();
    let m5 = reg.monoid_of(five).unwrap().unwrap();
    let m7 = reg.monoid_of(seven).unwrap().unwrap();
    assert_ne!(m5, m7);
    assert_eq!(reg.curry(m, &Params::new().arg(5i64)).unwrap(), m5);
    assert_eq!(reg.binaryop_of(m5).unwrap(), Some(five));

    let v = int_vector(3, &[(0, 3), (1, 4), (2, 6)]);
    assert_eq!(v.reduce(&ctx, m5).unwrap().new().unwrap().as_i64().unwrap(), 3);
    assert_eq!(v.reduce(&ctx, m7).unwrap().new().unwrap().as_i64().unwrap(), 6);
}

#[test]
fn test_instances_curried_before_monoid_keep_no_monoid() {
    let ctx = create_context();
    let reg = ctx.registry();
    let b = register_modplus(reg, "late.modplus");
    let early = reg.curry(b, &Params::new().arg(3i64)).unwrap();
    assert_eq!(reg.monoid_of(early).unwrap(), None);

    reg.register(
        "late.modplus",
        Definition::Monoid {
            binaryop: b,
            identity: Identity::Value(Value::Int(0)),
            idempotent: false,
        },
    )
    .unwrap();
    let later = reg.curry(b, &Params::new().arg(3i64)).unwrap();
    assert_ne!(early, later);
    assert_eq!(reg.monoid_of(early).unwrap(), None);
    assert!(reg.monoid_of(later).unwrap().is_some());
}

#[test]
fn test_parameterized_identity_signature_must_match() {
    let ctx = create_context();
    let reg = ctx.registry();
    let b = register_modplus(reg, "modplus");
    let err = reg
        .register(
            "modplus_bad",
            Definition::Monoid {
                binaryop: b,
                identity: Identity::parameterized(ParamSignature::new().required("n"), |_| {
                    Ok(Value::Int(0))
                }),
                idempotent: false,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::SignatureMismatch { .. }), "{err}");
    assert!(err.is_value_error());
    assert!(reg.lookup(OpKind::Monoid, "modplus_bad").is_err());
    assert_eq!(reg.monoid_of(b).unwrap(), None);
}

#[test]
fn test_failing_identity_surfaces_at_use() {
    let ctx = create_context();
    let reg = ctx.registry();
    let b = register_modplus(reg, "modplus");
    let m = reg
        .register_anonymous(
            "broken_monoid",
            Definition::Monoid {
                binaryop: b,
                identity: Identity::parameterized(ParamSignature::new().required("m"), |_| {
                    Err(Error::invalid_value("no identity for this modulus"))
                }),
                idempotent: true,
            },
        )
        .unwrap();
    assert_eq!(reg.monoid_of(b).unwrap(), Some(m));
    assert!(reg.info(m).unwrap().is_idempotent);

    let err = reg.curry(m, &Params::new().arg(1i64)).unwrap_err();
    assert!(err.is_value_error(), "{err}");

    let one = reg.curry(b, &Params::new().arg(1i64)).unwrap();
    assert_eq!(reg.monoid_of(one).unwrap(), None);
    assert_eq!(reg.monoid_of(b).unwrap(), Some(m));
}

#[test]
fn test_monoid_on_one_instance_leaves_sibling_alone() {
    let ctx = create_context();
    let reg = ctx.registry();
    let b = register_modplus(reg, "modplus");
    let five = reg.curry(b, &Params::new().arg(5i64)).unwrap();
    let seven = reg.curry(b, &Params::new().arg(7i64)).unwrap();
    let m = reg
        .register_anonymous(
            "modplus5",
            Definition::Monoid {
                binaryop: five,
                identity: Identity::Value(Value::Int(0)),
                idempotent: false,
            },
        )
        .unwrap();
    assert_eq!(reg.monoid_of(five).unwrap(), Some(m));
    assert_eq!(reg.monoid_of(seven).unwrap(), None);
    assert_eq!(reg.monoid_of(b).unwrap(), None);
}

#[test]
fn test_curried_binary_in_expressions() {
    let ctx = create_context();
    let b = register_modplus(ctx.registry(), "modplus");
    let five = ctx.registry().curry(b, &Params::new().arg(5i64)).unwrap();
    let u = int_vector(3, &[(0, 3), (2, 4)]);
    let v = int_vector(3, &[(0, 4), (1, 1)]);
    let w = u.ewise_add(&ctx, &v, five).unwrap().new().unwrap();
    assert_eq!(w.get(&[0]).unwrap(), Some(Value::Int(2)));
    assert_eq!(w.get(&[1]).unwrap(), Some(Value::Int(1)));
    assert_eq!(w.get(&[2]).unwrap(), Some(Value::Int(4)));

    // a parameterized operator cannot be resolved without parameters
    let err = u.ewise_add(&ctx, &v, b).unwrap_err();
    assert!(err.is_value_error(), "{err}");
}
