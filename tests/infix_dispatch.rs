//! Infix operators over vectors, matrices, scalars and literals

mod common;

use common::{assert_int_entries, create_context, int_matrix, int_vector};
use graphalg::context::OutputSpec;
use graphalg::prelude::*;

#[test]
fn test_outer_add_passes_one_sided_entries_through() {
    let ctx = create_context();
    let u = int_vector(2, &[(0, 1)]);
    let v = int_vector(2, &[(1, 2)]);
    let w = infix::add(&ctx, &u, &v).unwrap().new().unwrap();
    assert_int_entries(&w, &[(0, 1), (1, 2)], "u + v");
}

#[test]
fn test_outer_and_plain_roles_differ_on_overlap() {
    let ctx = create_context();
    let u = int_vector(2, &[(0, 1), (1, 5)]);
    let v = int_vector(2, &[(1, 2)]);
    let sum = infix::add(&ctx, &u, &v).unwrap().new().unwrap();
    assert_int_entries(&sum, &[(0, 1), (1, 7)], "u + v");

    let plus = ctx.binary("plus").unwrap();
    let inter = u.ewise_mult(&ctx, &v, plus).unwrap().new().unwrap();
    assert_int_entries(&inter, &[(1, 7)], "ewise_mult(plus)");

    let prod = infix::mul(&ctx, &u, &v).unwrap().new().unwrap();
    assert_int_entries(&prod, &[(1, 10)], "u * v");
}

#[test]
fn test_union_sub_negates_right_only_entries() {
    let ctx = create_context();
    let u = int_vector(3, &[(0, 1)]);
    let v = int_vector(3, &[(2, 2)]);
    let w = infix::sub(&ctx, &u, &v).unwrap().new().unwrap();
    assert_int_entries(&w, &[(0, 1), (2, -2)], "u - v");
    let r = infix::rsub(&ctx, &u, &v).unwrap().new().unwrap();
    assert_int_entries(&r, &[(0, -1), (2, 2)], "v - u");
}

#[test]
fn test_scalar_and_container_commute() {
    let ctx = create_context();
    let v = int_vector(3, &[(0, 1), (2, 8)]);
    let left = infix::lt(&ctx, 2i64, &v).unwrap().new().unwrap();
    let right = infix::gt(&ctx, &v, 2i64).unwrap().new().unwrap();
    assert!(left.isequal(&right));
    assert_eq!(left.dtype(), DType::Bool);
    assert_eq!(left.get(&[2]).unwrap(), Some(Value::Bool(true)));

    let a = infix::add(&ctx, 10i64, &v).unwrap().new().unwrap();
    let b = infix::add(&ctx, &v, 10i64).unwrap().new().unwrap();
    assert!(a.isequal(&b));
}

#[test]
fn test_literal_adopts_container_dtype() {
    let ctx = create_context();
    let v = Vector::from_coo([0], [1.5f64], DType::F64, 1).unwrap();
    assert_eq!(infix::add(&ctx, &v, 1i64).unwrap().dtype(), DType::F64);
    let i = Vector::from_coo([0], [1i32], DType::I32, 1).unwrap();
    assert_eq!(infix::add(&ctx, &i, 2i64).unwrap().dtype(), DType::I32);
    assert_eq!(infix::add(&ctx, &i, 2.5f64).unwrap().dtype(), DType::F64);
}

#[test]
fn test_matrix_and_transpose() {
    let ctx = create_context();
    let a = int_matrix(2, 2, &[(0, 1, 3)]);
    let b = int_matrix(2, 2, &[(1, 0, 4)]);
    let sum = infix::add(&ctx, &a, b.t()).unwrap().new().unwrap();
    assert_eq!(sum.get(&[0, 1]).unwrap(), Some(Value::Int(7)));
    assert_eq!(sum.nvals(), 1);

    let v = int_vector(3, &[(0, 1)]);
    let err = infix::add(&ctx, &a, &v).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }), "{err}");
}

#[test]
fn test_logical_operators_require_bool() {
    let ctx = create_context();
    let u = int_vector(2, &[(0, 1)]);
    for err in [
        infix::xor(&ctx, &u, &u).unwrap_err(),
        infix::or(&ctx, &u, &u).unwrap_err(),
        infix::and(&ctx, &u, &u).unwrap_err(),
    ] {
        assert!(err.is_type_error());
        assert!(err.to_string().contains("only supported for BOOL dtype"), "{err}");
    }
    assert_eq!(
        infix::invert(&ctx, &u).unwrap_err().to_string(),
        "The invert operator, `~`, is not supported for INT64 dtype.  It is only supported for BOOL dtype."
    );

    let p = Vector::from_coo([0, 1], [true, true], DType::Bool, 2).unwrap();
    let q = Vector::from_coo([1], [false], DType::Bool, 2).unwrap();
    let or = infix::or(&ctx, &p, &q).unwrap().new().unwrap();
    assert_eq!(or.nvals(), 2);
    let and = infix::and(&ctx, &p, &q).unwrap().new().unwrap();
    assert_eq!(and.nvals(), 1);
    assert_eq!(and.get(&[1]).unwrap(), Some(Value::Bool(false)));
}

#[test]
fn test_iadd_accumulates_container_in_place() {
    let ctx = create_context();
    let mut w = int_vector(3, &[(0, 1), (1, 5)]);
    let name = w.name().to_string();
    let v = int_vector(3, &[(1, 2), (2, 3)]);
    infix::iadd(&ctx, &mut w, &v).unwrap();
    assert_int_entries(&w, &[(0, 1), (1, 7), (2, 3)], "w += v");
    assert_eq!(w.name(), name);
}

#[test]
fn test_iadd_literal_only_touches_stored_entries() {
    let ctx = create_context();
    let mut w = int_vector(3, &[(0, 1), (2, 4)]);
    infix::iadd(&ctx, &mut w, 10i64).unwrap();
    assert_int_entries(&w, &[(0, 11), (2, 14)], "w += 10");

    let mut s = Scalar::from_value(2i64);
    infix::iadd(&ctx, &mut s, 3i64).unwrap();
    assert_eq!(s.value(), Some(Value::Int(5)));
}

#[test]
fn test_iadd_vector_into_matrix_is_rejected() {
    let ctx = create_context();
    let mut a = int_matrix(2, 2, &[(0, 0, 1)]);
    let v = int_vector(2, &[(0, 1)]);
    assert!(infix::iadd(&ctx, &mut a, &v).is_err());
    assert_eq!(a.get(0, 0), Some(Value::Int(1)));
}

#[test]
fn test_ixor_checks_operand_dtype() {
    let ctx = create_context();
    let mut p = Vector::from_coo([0], [true], DType::Bool, 2).unwrap();
    let q = Vector::from_coo([0, 1], [true, true], DType::Bool, 2).unwrap();
    infix::ixor(&ctx, &mut p, &q).unwrap();
    assert_eq!(p.get(0), Some(Value::Bool(false)));
    assert_eq!(p.get(1), Some(Value::Bool(true)));

    let n = int_vector(2, &[(0, 1)]);
    let err = infix::ixor(&ctx, &mut p, &n).unwrap_err();
    assert!(err.to_string().starts_with("The ixor infix operator"), "{err}");
}

#[test]
fn test_isub_recomputes_then_masked_update() {
    let ctx = create_context();
    let mut w = int_vector(3, &[(0, 5), (1, 5)]);
    let v = int_vector(3, &[(1, 2), (2, 1)]);
    infix::isub(&ctx, &mut w, &v).unwrap();
    assert_int_entries(&w, &[(0, 5), (1, 3), (2, -1)], "w -= v");

    // update through a structural mask keeps positions outside it
    let mask = int_vector(3, &[(0, 0)]);
    ctx.update(&mut w, 9i64, OutputSpec::new().mask(mask.s())).unwrap();
    assert_int_entries(&w, &[(0, 9), (1, 3), (2, -1)], "w(mask.S) << 9");
}

#[test]
fn test_divmod_and_unary_ops() {
    let ctx = create_context();
    let v = int_vector(2, &[(0, 7), (1, -7)]);
    let (q, r) = infix::divmod(&ctx, &v, 2i64).unwrap();
    assert_int_entries(&q.new().unwrap(), &[(0, 3), (1, -4)], "v // 2");
    assert_int_entries(&r.new().unwrap(), &[(0, 1), (1, 1)], "v % 2");

    let neg = infix::neg(&ctx, &v).unwrap().new().unwrap();
    assert_int_entries(&neg, &[(0, -7), (1, 7)], "-v");
    let abs = infix::abs(&ctx, &v).unwrap().new().unwrap();
    assert_int_entries(&abs, &[(0, 7), (1, 7)], "abs(v)");
}
