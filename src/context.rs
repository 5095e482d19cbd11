//! The system context: registry, descriptor cache, engine, and policy

use crate::config::Config;
use crate::container::{Collection, Mask, Operand, Shape, Sparse};
use crate::descriptor::{Descriptor, DescriptorCache, DescriptorFlags, OptionValue};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::expr::{literal_dtype, Arg};
use crate::ops::{OpId, OpKind, Registry, TypedOp};
use crate::runtime::{CpuEngine, Engine, EngineFailure, Invocation, Method};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owner of every piece of process-wide state
///
/// A context holds the operator registry, the descriptor cache, the compute
/// engine, and the autocompute policy. Expressions borrow the context they
/// were built from, so a context outlives everything computed through it.
///
/// # Example
///
/// ```
/// use graphalg::prelude::*;
///
/// let ctx = Context::new().unwrap();
/// let u = Vector::from_coo([0, 1], [1i64, 5], DType::I64, 3).unwrap();
/// let v = Vector::from_coo([1], [2i64], DType::I64, 3).unwrap();
/// let w = infix::add(&ctx, &u, &v).unwrap().new().unwrap();
/// assert_eq!(w.get(&[1]).unwrap(), Some(Value::Int(7)));
/// ```
pub struct Context {
    registry: Registry,
    descriptors: DescriptorCache,
    engine: Arc<dyn Engine>,
    autocompute: AtomicBool,
}

impl Context {
    /// Builtin operators on the CPU engine with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Builtin operators on the CPU engine
    pub fn with_config(config: Config) -> Result<Self> {
        Self::with_engine(Arc::new(CpuEngine::new()), config)
    }

    /// Builtin operators on `engine`
    pub fn with_engine(engine: Arc<dyn Engine>, config: Config) -> Result<Self> {
        Ok(Self::from_parts(Registry::with_builtins()?, engine, config))
    }

    /// Assemble from an existing registry
    pub fn from_parts(registry: Registry, engine: Arc<dyn Engine>, config: Config) -> Self {
        log::debug!(
            "context on {} engine, autocompute {}",
            engine.name(),
            config.autocompute
        );
        Self {
            registry,
            descriptors: DescriptorCache::new(engine.clone()),
            engine,
            autocompute: AtomicBool::new(config.autocompute),
        }
    }

    /// Operator registry
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Descriptor cache
    #[inline]
    pub fn descriptors(&self) -> &DescriptorCache {
        &self.descriptors
    }

    /// Compute engine
    #[inline]
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Whether deferred expressions compute themselves on access
    pub fn autocompute(&self) -> bool {
        self.autocompute.load(Ordering::Acquire)
    }

    /// Set the autocompute policy
    pub fn set_autocompute(&self, on: bool) {
        self.autocompute.store(on, Ordering::Release);
    }

    /// Set the autocompute policy until the guard drops
    pub fn autocompute_guard(&self, on: bool) -> AutocomputeGuard<'_> {
        let previous = self.autocompute.swap(on, Ordering::AcqRel);
        AutocomputeGuard { ctx: self, previous }
    }

    /// Unary operator by name
    pub fn unary(&self, name: &str) -> Result<OpId> {
        self.registry.lookup(OpKind::Unary, name)
    }

    /// Binary operator by name
    pub fn binary(&self, name: &str) -> Result<OpId> {
        self.registry.lookup(OpKind::Binary, name)
    }

    /// Monoid by name
    pub fn monoid(&self, name: &str) -> Result<OpId> {
        self.registry.lookup(OpKind::Monoid, name)
    }

    /// Semiring by name
    pub fn semiring(&self, name: &str) -> Result<OpId> {
        self.registry.lookup(OpKind::Semiring, name)
    }

    /// Index-unary operator by name
    pub fn indexunary(&self, name: &str) -> Result<OpId> {
        self.registry.lookup(OpKind::IndexUnary, name)
    }

    /// Select operator by name
    pub fn select(&self, name: &str) -> Result<OpId> {
        self.registry.lookup(OpKind::Select, name)
    }

    /// Write `source` into `target` through the mask, accumulator, and replace flag of `spec`
    ///
    /// An unmaterialized expression is computed straight into the target
    /// without going through the autocompute policy. A scalar source is
    /// broadcast to every position of a vector or matrix target.
    pub fn update<'s, C>(
        &self,
        target: &mut C,
        source: impl Into<Operand<'s>>,
        spec: OutputSpec<'_>,
    ) -> Result<()>
    where
        C: Collection + ?Sized,
    {
        let source = source.into();
        if let Operand::Expr(e) = source {
            if !e.is_materialized() {
                return e.write_into(target, &spec);
            }
        }
        let arg = match source {
            Operand::Literal(v) => {
                let dtype = literal_dtype(v, Some(target.data().dtype()));
                Arg::owned(Sparse::scalar(dtype, v))
            }
            other => Arg::from_operand(other, "update")?,
        };
        let dtype = arg.data().dtype();
        let shape = arg.shape();
        self.assign(target, &Method::Assign, None, &[arg], dtype, shape, &spec)
    }

    /// Run an operation and return its result
    pub(crate) fn compute(
        &self,
        method: &Method,
        op: Option<&TypedOp>,
        args: &[Arg<'_>],
        dtype: DType,
        shape: Shape,
        name: &str,
    ) -> Result<Sparse> {
        let descriptor = self.descriptors.lookup(transpose_flags(args));
        let inputs: Vec<&Sparse> = args.iter().map(|a| a.data()).collect();
        let call = Invocation {
            method,
            op,
            inputs: &inputs,
            descriptor: descriptor.as_deref(),
            dtype,
            shape,
            output: None,
            mask: None,
            accum: None,
        };
        self.invoke(&call, name)
    }

    /// Run an operation and write its result into `target`
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assign<C>(
        &self,
        target: &mut C,
        method: &Method,
        op: Option<&TypedOp>,
        args: &[Arg<'_>],
        dtype: DType,
        shape: Shape,
        spec: &OutputSpec<'_>,
    ) -> Result<()>
    where
        C: Collection + ?Sized,
    {
        let out_shape = target.data().shape();
        let fill = matches!(method, Method::Assign) && shape == Shape::Scalar;
        if shape != out_shape && !fill {
            return Err(Error::dimension_mismatch(
                "update",
                &out_shape.dims(),
                &shape.dims(),
            ));
        }
        if let Some(mask) = &spec.mask {
            let mask_shape = mask.data().shape();
            if mask_shape != out_shape {
                return Err(Error::dimension_mismatch(
                    "mask",
                    &mask_shape.dims(),
                    &out_shape.dims(),
                ));
            }
        }
        let accum = match spec.accum {
            Some(id) => {
                let kind = self.registry.kind(id)?;
                if !matches!(kind, OpKind::Binary | OpKind::Monoid) {
                    return Err(Error::invalid_type(format!(
                        "accum must be a BinaryOp or Monoid, got {} {}",
                        kind.type_name(),
                        self.registry.name(id)?
                    )));
                }
                Some(self.registry.resolve(id, &[target.data().dtype(), dtype])?)
            }
            None => None,
        };

        let mut flags = transpose_flags(args);
        flags.output_replace = spec.replace;
        if let Some(mask) = &spec.mask {
            flags.mask_complement = mask.complement();
            flags.mask_structure = mask.structure();
        }
        let descriptor: Option<Arc<Descriptor>> = self.descriptors.lookup_with(flags, &spec.options)?;

        let inputs: Vec<&Sparse> = args.iter().map(|a| a.data()).collect();
        let result = {
            let call = Invocation {
                method,
                op,
                inputs: &inputs,
                descriptor: descriptor.as_deref(),
                dtype,
                shape: if fill { out_shape } else { shape },
                output: Some(target.data()),
                mask: spec.mask.as_ref().map(|m| m.data()),
                accum: accum.as_ref(),
            };
            self.invoke(&call, target.name())?
        };
        *target.data_mut() = result;
        Ok(())
    }

    fn invoke(&self, call: &Invocation<'_>, name: &str) -> Result<Sparse> {
        log::trace!("invoking {} for {name}", call.method.name());
        self.engine
            .invoke(call)
            .map_err(|failure| self.engine_error(failure, name))
    }

    fn engine_error(&self, failure: EngineFailure, name: &str) -> Error {
        Error::Engine {
            kind: failure.kind,
            backend: self.engine.name().to_string(),
            container: (!name.is_empty()).then(|| name.to_string()),
            message: failure.message,
        }
    }
}

fn transpose_flags(args: &[Arg<'_>]) -> DescriptorFlags {
    DescriptorFlags {
        transpose_first: args.first().is_some_and(|a| a.transposed()),
        transpose_second: args.get(1).is_some_and(|a| a.transposed()),
        ..Default::default()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("registry", &self.registry)
            .field("engine", &self.engine.name())
            .field("autocompute", &self.autocompute())
            .finish()
    }
}

/// Restores the previous autocompute policy on drop
#[must_use = "the policy is restored as soon as the guard drops"]
pub struct AutocomputeGuard<'a> {
    ctx: &'a Context,
    previous: bool,
}

impl Drop for AutocomputeGuard<'_> {
    fn drop(&mut self) {
        self.ctx.set_autocompute(self.previous);
    }
}

/// How a write lands in its target
///
/// # Example
///
/// ```
/// use graphalg::prelude::*;
///
/// let ctx = Context::new().unwrap();
/// let mask = Vector::from_coo([0], [true], DType::Bool, 3).unwrap();
/// let mut w = Vector::from_coo([0, 2], [1i64, 1], DType::I64, 3).unwrap();
/// ctx.update(&mut w, 5i64, OutputSpec::new().mask(mask.s()).replace(true)).unwrap();
/// assert_eq!(w.to_coo().0, vec![0]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct OutputSpec<'m> {
    mask: Option<Mask<'m>>,
    accum: Option<OpId>,
    replace: bool,
    options: Vec<(String, OptionValue)>,
}

impl<'m> OutputSpec<'m> {
    /// No mask, no accumulator, no replace
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate the write with `mask`
    pub fn mask(mut self, mask: Mask<'m>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Combine with existing entries using a binary operator or monoid
    pub fn accum(mut self, op: OpId) -> Self {
        self.accum = Some(op);
        self
    }

    /// Clear positions the mask does not allow
    pub fn replace(mut self, on: bool) -> Self {
        self.replace = on;
        self
    }

    /// Backend extension descriptor option
    pub fn option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.push((name.into(), value.into()));
        self
    }
}
