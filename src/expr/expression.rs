//! The deferred expression type

use super::Arg;
use crate::container::{next_name, AlgebraicOperand, Collection, Container, Coo, Operand, Shape};
use crate::context::{Context, OutputSpec};
use crate::dtype::{DType, Value};
use crate::error::{Error, Result};
use crate::ops::{Position, TypedOp};
use crate::runtime::Method;
use std::cell::OnceCell;
use std::fmt;

/// An unevaluated operation
///
/// An expression starts unmaterialized. [`Expression::materialize`] (or any
/// value accessor while autocompute is on) computes it once; every later
/// access reuses that same container, including any name given to it.
///
/// # Example
///
/// ```
/// use graphalg::prelude::*;
///
/// let ctx = Context::new().unwrap();
/// let v = Vector::from_coo([0, 2], [1i64, 2], DType::I64, 3).unwrap();
/// let e = v.apply(&ctx, ctx.unary("ainv").unwrap()).unwrap();
/// assert!(e.nvals().is_err());
/// e.materialize().unwrap();
/// assert_eq!(e.nvals().unwrap(), 2);
/// ```
pub struct Expression<'a> {
    ctx: &'a Context,
    method: Method,
    op: Option<TypedOp>,
    args: Vec<Arg<'a>>,
    dtype: DType,
    shape: Shape,
    value: OnceCell<Container>,
}

impl<'a> Expression<'a> {
    pub(crate) fn build(
        ctx: &'a Context,
        method: Method,
        op: Option<TypedOp>,
        args: Vec<Arg<'a>>,
        dtype: DType,
        shape: Shape,
    ) -> Self {
        Self {
            ctx,
            method,
            op,
            args,
            dtype,
            shape,
            value: OnceCell::new(),
        }
    }

    /// Context the expression was built in
    pub fn context(&self) -> &'a Context {
        self.ctx
    }

    /// Element type of the result
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Shape of the result
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of dimensions of the result
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Combinator that produced the expression (e.g. `ewise_add`)
    pub fn method_name(&self) -> &'static str {
        self.method.name()
    }

    /// Typed operator, when the combinator has one
    pub fn op(&self) -> Option<&TypedOp> {
        self.op.as_ref()
    }

    /// Whether the result has been computed and cached
    pub fn is_materialized(&self) -> bool {
        self.value.get().is_some()
    }

    /// Type name used in messages, e.g. `VectorExpression`
    pub fn type_name(&self) -> String {
        format!("{}Expression", self.shape.type_name())
    }

    /// Type name of the result
    pub fn output_type(&self) -> &'static str {
        self.shape.type_name()
    }

    /// Compute a fresh container; the result is never cached
    #[allow(clippy::new_ret_no_self, clippy::wrong_self_convention)]
    pub fn new(&self) -> Result<Container> {
        let name = next_name(self.shape);
        let data = self.ctx.compute(
            &self.method,
            self.op.as_ref(),
            &self.args,
            self.dtype,
            self.shape,
            &name,
        )?;
        Ok(Container::from_sparse(name, data))
    }

    /// Compute at most once and cache the result
    pub fn materialize(&self) -> Result<&Container> {
        if let Some(c) = self.value.get() {
            return Ok(c);
        }
        let computed = self.new()?;
        log::debug!(
            "materialized {} as {}",
            self.method_name(),
            computed.name()
        );
        Ok(self.value.get_or_init(|| computed))
    }

    /// The cached result, if materialized
    pub fn cached(&self) -> Option<&Container> {
        self.value.get()
    }

    /// Cached result, materializing only under the autocompute policy
    pub(crate) fn gate(&self, attr: &str) -> Result<&Container> {
        if let Some(c) = self.value.get() {
            return Ok(c);
        }
        if self.ctx.autocompute() {
            self.materialize()
        } else {
            Err(self.refused(attr))
        }
    }

    pub(crate) fn refused(&self, attr: &str) -> Error {
        Error::MaterializationRefused {
            attr: attr.to_string(),
            expr_type: self.type_name(),
            output_type: self.output_type(),
        }
    }

    fn computed<'s, T>(&'s self, attr: &str, f: impl FnOnce(&'s Container) -> T) -> Result<T> {
        self.gate(attr).map(f)
    }

    /// Name of the computed container
    pub fn name(&self) -> Result<&str> {
        self.computed("name", |c| c.name())
    }

    /// Rename the computed container; the name sticks to the cached result
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.gate("name")?;
        if let Some(c) = self.value.get_mut() {
            c.set_name(name);
        }
        Ok(())
    }

    /// Number of stored entries
    pub fn nvals(&self) -> Result<usize> {
        self.computed("nvals", |c| c.nvals())
    }

    /// Whether the result stores nothing
    pub fn is_empty(&self) -> Result<bool> {
        self.computed("is_empty", |c| c.is_empty())
    }

    /// Value at an index list (`[]`, `[i]`, or `[row, col]`)
    pub fn get(&self, index: &[u64]) -> Result<Option<Value>> {
        self.computed("get", |c| c.get(index))?
    }

    /// Value of a scalar result
    pub fn value(&self) -> Result<Option<Value>> {
        self.computed("value", |c| c.value())?
    }

    /// Coordinate lists of the result
    pub fn to_coo(&self) -> Result<Coo> {
        self.computed("to_coo", |c| c.to_coo())
    }

    /// Stored entries in row-major order
    pub fn iter(&self) -> Result<impl Iterator<Item = (Position, Value)> + '_> {
        self.computed("iter", |c| c.iter())
    }

    /// Truthiness of a scalar result
    pub fn as_bool(&self) -> Result<bool> {
        self.computed("as_bool", |c| c.as_bool())?
    }

    /// Scalar result as an exact integer
    pub fn as_i64(&self) -> Result<i64> {
        self.computed("as_i64", |c| c.as_i64())?
    }

    /// Scalar result as a float
    pub fn as_f64(&self) -> Result<f64> {
        self.computed("as_f64", |c| c.as_f64())?
    }

    /// Equal shape, pattern, and values
    pub fn isequal<C: Collection + ?Sized>(&self, other: &C) -> Result<bool> {
        self.computed("isequal", |c| c.data().isequal(other.data(), false))
    }

    /// Like [`Expression::isequal`], within tolerances
    pub fn isclose<C: Collection + ?Sized>(&self, other: &C, rel_tol: f64, abs_tol: f64) -> Result<bool> {
        self.computed("isclose", |c| {
            c.data().isclose(other.data(), rel_tol, abs_tol, false)
        })
    }

    /// Always refused: `==` is never computed implicitly
    #[allow(clippy::should_implement_trait)]
    pub fn eq<'o>(&self, _other: impl Into<Operand<'o>>) -> Result<Expression<'a>> {
        Err(Error::EqualityRefused {
            expr_type: self.type_name(),
            output_type: self.output_type(),
        })
    }

    /// Compute straight into `target`
    pub(crate) fn write_into<C>(&self, target: &mut C, spec: &OutputSpec<'_>) -> Result<()>
    where
        C: Collection + ?Sized,
    {
        self.ctx.assign(
            target,
            &self.method,
            self.op.as_ref(),
            &self.args,
            self.dtype,
            self.shape,
            spec,
        )
    }
}

impl AlgebraicOperand for Expression<'_> {
    fn operand(&self) -> Operand<'_> {
        Operand::Expr(self)
    }
}

impl fmt::Debug for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("method", &self.method.name())
            .field("op", &self.op.as_ref().map(|op| op.name()))
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}
