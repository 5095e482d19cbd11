//! Deferred expressions
//!
//! Every combinator returns an [`Expression`]: the operation, its resolved
//! typed operator, its arguments, and the dtype and shape of its result.
//! Nothing runs until one of three things happens:
//!
//! - [`Expression::new`] computes a fresh container (never cached),
//! - [`Expression::materialize`] computes once and caches the result,
//! - [`Context::update`](crate::Context::update) computes straight into an
//!   existing container.
//!
//! # Autocompute
//!
//! Value accessors (`nvals`, `get`, `to_coo`, ...) need a computed result.
//! With the context's autocompute policy on, the first such access
//! materializes the expression. With it off, the access fails with
//! [`Error::MaterializationRefused`](crate::Error::MaterializationRefused)
//! until the expression has been materialized explicitly. Metadata (`dtype`,
//! `shape`, `method_name`) never needs a result.
//!
//! `==` is never computed implicitly; use `isequal` instead.

mod arg;
mod builders;
mod expression;

pub(crate) use arg::{literal_dtype, Arg};
pub use builders::{
    apply, apply_index, apply_left, apply_right, ewise_add, ewise_mult, ewise_union, mxm, mxv,
    reduce, reduce_columnwise, reduce_rowwise, select, vxm,
};
pub use expression::Expression;
