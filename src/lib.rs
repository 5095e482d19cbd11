//! # graphalg
//!
//! **Operator algebra and deferred expressions over a sparse linear-algebra engine.**
//!
//! graphalg keeps a typed registry of unary, binary, index-unary and select
//! operators, monoids and semirings; canonicalizes execution descriptors; and
//! builds element-wise and multiply operations as deferred [`Expression`]s that
//! are evaluated by a pluggable [`Engine`](runtime::Engine).
//!
//! ## Pieces
//!
//! - **Registry**: named operators with per-type kernels, coercion to the
//!   smallest safe type, commute links, parameterized operators
//! - **Descriptors**: 31 shared flag combinations plus memoized extension options
//! - **Infix dispatch**: `+`, `-`, `*`, comparisons and logical operators mapped
//!   to union or intersection combinators
//! - **Expressions**: never computed implicitly unless autocompute is on
//!
//! ## Quick Start
//!
//! ```rust
//! use graphalg::prelude::*;
//!
//! let ctx = Context::new().unwrap();
//! let u = Vector::from_coo([0, 1], [1i64, 5], DType::I64, 3).unwrap();
//! let v = Vector::from_coo([1], [2i64], DType::I64, 3).unwrap();
//!
//! let sum = infix::add(&ctx, &u, &v).unwrap().new().unwrap();
//! assert_eq!(sum.get(&[1]).unwrap(), Some(Value::Int(7)));
//!
//! let product = infix::mul(&ctx, &u, &v).unwrap().new().unwrap();
//! assert_eq!(product.nvals(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for [`Config`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod container;
pub mod context;
pub mod descriptor;
pub mod dtype;
pub mod error;
pub mod expr;
pub mod ops;
pub mod runtime;

pub use config::Config;
pub use container::{Container, Matrix, Scalar, Vector};
pub use context::{AutocomputeGuard, Context, OutputSpec};
pub use dtype::{DType, Value};
pub use error::{Error, Result};
pub use expr::Expression;
pub use ops::{infix, OpId, OpKind, Registry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::container::{AlgebraicOperand, Collection, Container, Matrix, Scalar, Vector};
    pub use crate::context::{Context, OutputSpec};
    pub use crate::dtype::{DType, Value};
    pub use crate::error::{Error, Result};
    pub use crate::expr::Expression;
    pub use crate::ops::{infix, OpId, OpKind, Registry};
}
