//! Operator algebra
//!
//! This module holds the operator registry and everything built on it.
//!
//! ```text
//! Registry
//!   ├── namespaces   one tree per OpKind (binary.plus, binary.numpy.mod, ...)
//!   ├── arena        every operator by OpId, named or anonymous
//!   │     ├── concrete        kernel table keyed by TypeKey
//!   │     ├── parameterized   signature + factory + memo of curried instances
//!   │     └── reserved        name claimed, kernels bound later
//!   └── links        commutes_to, binary <-> monoid, (monoid, binary) -> semiring
//! ```
//!
//! # Resolution
//!
//! [`Registry::resolve`] turns an operator and one or two element types into a
//! [`TypedOp`]. A declared key is used as-is; otherwise the smallest declared
//! key the request casts to safely is chosen and recorded as a coercion.
//! Positional operators ignore values, so every request maps to their INT64
//! kernel.
//!
//! # Parameterized operators
//!
//! [`Registry::curry`] binds parameters and returns a concrete operator. The
//! same parameters always return the same instance. A curried binary operator
//! picks up the monoid curried with the same parameters when its parent has
//! one; instances created before that monoid was attached keep no monoid.
//!
//! # Infix dispatch
//!
//! [`infix`] maps Python-style operator symbols onto element-wise combinators.
//! See its module docs for the routing rules.

mod builtins;
mod definition;
pub mod infix;
mod kernel;
mod kind;
mod namespace;
mod param;
mod parse;
mod registry;
mod typed;

pub use definition::{Definition, Identity, IdentityFactory, KernelFactory, OpDefinition, ReturnType};
pub use kernel::{KernelFn, KernelHandle, Position};
pub use kind::{OpId, OpKind, TypeKey};
pub use param::{Param, ParamSignature, Params};
pub use parse::ParsedOp;
pub use registry::{OpInfo, Registry};
pub use typed::{AddPart, TypedOp};
