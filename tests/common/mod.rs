//! Common test utilities
#![allow(dead_code)]

use graphalg::container::Collection;
use graphalg::prelude::*;
use graphalg::runtime::CpuEngine;
use graphalg::Config;
use std::sync::Arc;

/// Context with builtin operators on a fresh CPU engine
pub fn create_context() -> Context {
    Context::new().expect("builtin registry")
}

/// Context plus the CPU engine behind it, for handle bookkeeping checks
pub fn create_context_with_engine(engine: CpuEngine) -> (Context, Arc<CpuEngine>) {
    let engine = Arc::new(engine);
    let ctx = Context::with_engine(engine.clone(), Config::new()).expect("builtin registry");
    (ctx, engine)
}

/// INT64 vector from `(index, value)` pairs
pub fn int_vector(size: u64, entries: &[(u64, i64)]) -> Vector {
    Vector::from_coo(
        entries.iter().map(|&(i, _)| i),
        entries.iter().map(|&(_, v)| v),
        DType::I64,
        size,
    )
    .expect("valid coordinates")
}

/// INT64 matrix from `(row, col, value)` triples
pub fn int_matrix(nrows: u64, ncols: u64, entries: &[(u64, u64, i64)]) -> Matrix {
    Matrix::from_coo(
        entries.iter().map(|&(r, _, _)| r),
        entries.iter().map(|&(_, c, _)| c),
        entries.iter().map(|&(_, _, v)| v),
        DType::I64,
        nrows,
        ncols,
    )
    .expect("valid coordinates")
}

/// Assert a vector-shaped result holds exactly `expected`
pub fn assert_int_entries<C: Collection + ?Sized>(got: &C, expected: &[(u64, i64)], msg: &str) {
    let entries: Vec<(u64, i64)> = got
        .data()
        .iter()
        .map(|(pos, v)| (pos.row, v.try_to_i64().expect("integer value")))
        .collect();
    assert_eq!(entries, expected, "{}: entries differ", msg);
}
