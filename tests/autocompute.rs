//! Deferred expressions under both autocompute policies

mod common;

use common::{create_context, create_context_with_engine, int_matrix, int_vector};
use graphalg::prelude::*;
use graphalg::runtime::CpuEngine;
use graphalg::Config;

#[test]
fn test_accessors_refused_without_autocompute() {
    let ctx = create_context();
    assert!(!ctx.autocompute());
    let u = int_vector(3, &[(0, 1)]);
    let e = infix::add(&ctx, &u, &u).unwrap();
    for err in [
        e.nvals().unwrap_err(),
        e.name().unwrap_err(),
        e.get(&[0]).unwrap_err(),
        e.to_coo().unwrap_err(),
    ] {
        assert!(matches!(err, Error::MaterializationRefused { .. }), "{err}");
    }
    assert_eq!(e.type_name(), "VectorExpression");
    assert!(!e.is_materialized());

    // metadata never needs the value
    assert_eq!(e.dtype(), DType::I64);
    assert_eq!(e.ndim(), 1);
}

#[test]
fn test_expression_operand_is_gated() {
    let ctx = create_context();
    let u = int_vector(3, &[(0, 1)]);
    let e = infix::add(&ctx, &u, &u).unwrap();
    let err = infix::add(&ctx, &e, &u).unwrap_err();
    assert!(err.is_type_error(), "{err}");

    e.materialize().unwrap();
    let w = infix::add(&ctx, &e, &u).unwrap().new().unwrap();
    assert_eq!(w.get(&[0]).unwrap(), Some(Value::Int(3)));
}

#[test]
fn test_autocompute_materializes_at_most_once() {
    let ctx = Context::with_config(Config::new().autocompute(true)).unwrap();
    let a = int_matrix(2, 2, &[(0, 0, 1), (1, 1, 2)]);
    let plus_times = ctx.semiring("plus_times").unwrap();
    let mut e = a.mxm(&ctx, &a, plus_times).unwrap();
    assert_eq!(e.type_name(), "MatrixExpression");
    assert!(!e.is_materialized());

    assert_eq!(e.nvals().unwrap(), 2);
    let first = e.cached().unwrap() as *const Container;
    e.set_name("squared").unwrap();
    assert_eq!(e.name().unwrap(), "squared");
    assert_eq!(e.get(&[1, 1]).unwrap(), Some(Value::Int(4)));
    assert_eq!(e.cached().unwrap() as *const Container, first);
    assert_eq!(e.cached().unwrap().name(), "squared");
}

#[test]
fn test_guard_restores_policy() {
    let ctx = create_context();
    let u = int_vector(2, &[(1, 4)]);
    let max = ctx.monoid("max").unwrap();
    let e = u.reduce(&ctx, max).unwrap();
    {
        let _on = ctx.autocompute_guard(true);
        assert_eq!(e.as_i64().unwrap(), 4);
    }
    assert!(!ctx.autocompute());
    // already materialized, so no policy check is needed
    assert_eq!(e.as_i64().unwrap(), 4);

    let fresh = u.reduce(&ctx, max).unwrap();
    assert!(fresh.as_i64().is_err());
}

#[test]
fn test_equality_always_refused() {
    let ctx = Context::with_config(Config::new().autocompute(true)).unwrap();
    let u = int_vector(2, &[(0, 1)]);
    let e = infix::add(&ctx, &u, &u).unwrap();
    let err = e.eq(&u).unwrap_err();
    assert!(matches!(err, Error::EqualityRefused { .. }));
    assert!(err.is_type_error());
    assert!(matches!(infix::eq(&ctx, &e, &u), Err(Error::EqualityRefused { .. })));

    // comparing from the container side is element-wise
    let cmp = infix::eq(&ctx, &u, &e).unwrap().new().unwrap();
    assert_eq!(cmp.get(&[0]).unwrap(), Some(Value::Bool(false)));
}

#[test]
fn test_update_from_expression_bypasses_policy() {
    let ctx = create_context();
    let u = int_vector(2, &[(0, 1), (1, 2)]);
    let e = infix::mul(&ctx, &u, &u).unwrap();
    let mut w = Vector::new(DType::I64, 2);
    ctx.update(&mut w, &e, OutputSpec::new()).unwrap();
    assert_eq!(w.get(1), Some(Value::Int(4)));
    assert!(!e.is_materialized());
}

#[test]
fn test_engine_memory_limit_names_container() {
    let (ctx, _engine) = create_context_with_engine(CpuEngine::new().with_max_entries(4));
    let mut w = Vector::new(DType::I64, 10);
    let name = w.name().to_string();
    let err = ctx.update(&mut w, 1i64, OutputSpec::new()).unwrap_err();
    assert!(err.is_out_of_memory(), "{err}");
    assert!(err.to_string().contains(&name), "{err}");
    assert!(w.is_empty());
}
