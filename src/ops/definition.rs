//! Operator definitions accepted by the registry

use super::kernel::{KernelFn, KernelHandle, Position};
use super::kind::{OpId, OpKind, TypeKey};
use super::param::ParamSignature;
use crate::dtype::{DType, DTypeSet, Value};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Builds a concrete kernel table from bound parameter values
pub type KernelFactory = Arc<dyn Fn(&[Value]) -> Result<OpDefinition> + Send + Sync>;

/// Computes a monoid identity from bound parameter values
pub type IdentityFactory = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// How the return type of a user-defined kernel is chosen
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReturnType {
    /// Same as the input type
    SameAsInput,
    /// A fixed type for every input type
    Fixed(DType),
    /// Inferred by evaluating the kernel on a sample input
    Infer,
}

/// Kernel table of a unary, binary, index-unary, or select operator
#[derive(Clone, Debug, Default)]
pub struct OpDefinition {
    kernels: Vec<KernelHandle>,
    positional: bool,
}

impl OpDefinition {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kernel, keyed by its declared input type
    pub fn kernel(mut self, kernel: KernelHandle) -> Self {
        self.kernels.push(kernel);
        self
    }

    /// Mark the operator as positional (it reads indices, not values)
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// Kernels in insertion order
    pub fn kernels(&self) -> &[KernelHandle] {
        &self.kernels
    }

    /// Whether the operator is positional
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// Build a unary operator from one function over `dtypes`
    pub fn unary_udf<F>(name: &str, dtypes: DTypeSet, ret: ReturnType, f: F) -> Result<Self>
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let mut def = Self::new();
        for dt in dtypes.iter() {
            let out = infer_return(name, dt, ret, || f(Value::one(dt)))?;
            let f = Arc::clone(&f);
            def = def.kernel(KernelHandle::unary(format!("{name}_{dt}"), dt, out, move |x| f(x)));
        }
        Ok(def)
    }

    /// Build a binary operator from one function over `dtypes`
    pub fn binary_udf<F>(name: &str, dtypes: DTypeSet, ret: ReturnType, f: F) -> Result<Self>
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let mut def = Self::new();
        for dt in dtypes.iter() {
            let out = infer_return(name, dt, ret, || f(Value::one(dt), Value::one(dt)))?;
            let f = Arc::clone(&f);
            def = def.kernel(KernelHandle::binary(
                format!("{name}_{dt}"),
                dt,
                out,
                move |x, y| f(x, y),
            ));
        }
        Ok(def)
    }

    /// Build an index-unary (or select) operator from one function over `dtypes`
    pub fn index_unary_udf<F>(name: &str, dtypes: DTypeSet, ret: ReturnType, f: F) -> Result<Self>
    where
        F: Fn(Value, Position, Value) -> Value + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let mut def = Self::new();
        for dt in dtypes.iter() {
            let out = infer_return(name, dt, ret, || {
                f(Value::one(dt), Position::default(), Value::Int(0))
            })?;
            let f = Arc::clone(&f);
            def = def.kernel(KernelHandle::index_unary(
                format!("{name}_{dt}"),
                dt,
                out,
                move |x, pos, thunk| f(x, pos, thunk),
            ));
        }
        Ok(def)
    }

    /// Check every kernel against the operator kind and collect the table
    pub(crate) fn validate(&self, op: &str, kind: OpKind) -> Result<BTreeMap<TypeKey, KernelHandle>> {
        let mut table = BTreeMap::new();
        for k in &self.kernels {
            let ok = match (kind, k.func()) {
                (OpKind::Unary, KernelFn::Unary(_)) => true,
                (OpKind::Binary, KernelFn::Binary(_)) => true,
                (OpKind::Binary, KernelFn::Positional(_)) => self.positional,
                (OpKind::IndexUnary | OpKind::Select, KernelFn::IndexUnary(_)) => true,
                _ => false,
            };
            if !ok {
                return Err(Error::BadKernel {
                    op: op.to_string(),
                    reason: format!("kernel {} does not match a {} operator", k.name(), kind.type_name()),
                });
            }
            if matches!(k.input(), TypeKey::Pair(..)) && !kind.is_binary_like() {
                return Err(Error::BadKernel {
                    op: op.to_string(),
                    reason: format!("kernel {} declares two input types", k.name()),
                });
            }
            if kind == OpKind::Select && k.output() != DType::Bool {
                return Err(Error::BadKernel {
                    op: op.to_string(),
                    reason: format!("select kernel {} must return BOOL, not {}", k.name(), k.output()),
                });
            }
            if table.insert(k.input(), k.clone()).is_some() {
                return Err(Error::BadKernel {
                    op: op.to_string(),
                    reason: format!("more than one kernel declared for {}", k.input()),
                });
            }
        }
        if table.is_empty() {
            return Err(Error::BadKernel {
                op: op.to_string(),
                reason: "no kernels declared".to_string(),
            });
        }
        Ok(table)
    }
}

fn infer_return<S>(name: &str, input: DType, ret: ReturnType, sample: S) -> Result<DType>
where
    S: FnOnce() -> Value,
{
    match ret {
        ReturnType::SameAsInput => Ok(input),
        ReturnType::Fixed(dt) => Ok(dt),
        ReturnType::Infer => {
            let value = panic::catch_unwind(AssertUnwindSafe(sample)).map_err(|_| Error::BadKernel {
                op: name.to_string(),
                reason: format!("return type for {input} could not be determined"),
            })?;
            Ok(match value {
                Value::Bool(_) => DType::Bool,
                Value::Int(_) | Value::UInt(_) if input.is_int() => input,
                Value::Int(_) => DType::I64,
                Value::UInt(_) => DType::U64,
                Value::Float(_) if input.is_float() => input,
                Value::Float(_) => DType::F64,
                Value::Complex(_) if input.is_complex() => input,
                Value::Complex(_) => DType::Complex128,
            })
        }
    }
}

/// Identity of a monoid
#[derive(Clone)]
pub enum Identity {
    /// One value, used for every type of the binary operator it fits
    Value(Value),
    /// Explicit identities per element type
    PerType(BTreeMap<DType, Value>),
    /// Computed from the parameters of a parameterized monoid
    Parameterized(ParamSignature, IdentityFactory),
}

impl Identity {
    /// Per-type identities from `(dtype, value)` pairs
    pub fn per_type<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (DType, V)>,
        V: Into<Value>,
    {
        Self::PerType(pairs.into_iter().map(|(dt, v)| (dt, v.into())).collect())
    }

    /// Parameterized identity
    pub fn parameterized<F>(signature: ParamSignature, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Parameterized(signature, Arc::new(f))
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::PerType(m) => f.debug_tuple("PerType").field(m).finish(),
            Self::Parameterized(sig, _) => f.debug_tuple("Parameterized").field(sig).finish(),
        }
    }
}

/// Everything `Registry::register` accepts
#[derive(Clone)]
pub enum Definition {
    /// Concrete unary operator
    Unary(OpDefinition),
    /// Concrete binary operator
    Binary(OpDefinition),
    /// Concrete index-unary operator
    IndexUnary(OpDefinition),
    /// Concrete select operator
    Select(OpDefinition),
    /// Monoid over an existing binary operator
    Monoid {
        /// The binary operator
        binaryop: OpId,
        /// Identity value(s)
        identity: Identity,
        /// `op(x, x) == x` for all x
        idempotent: bool,
    },
    /// Semiring from an additive monoid and multiplicative binary operator
    Semiring {
        /// Additive monoid
        monoid: OpId,
        /// Multiplicative binary operator
        binaryop: OpId,
    },
    /// Unary, binary, index-unary, or select operator built per parameter set
    Parameterized {
        /// Operator kind produced by the factory
        kind: OpKind,
        /// Accepted parameters
        signature: ParamSignature,
        /// Kernel table factory
        factory: KernelFactory,
    },
}

impl Definition {
    /// Parameterized definition from a closure
    pub fn parameterized<F>(kind: OpKind, signature: ParamSignature, factory: F) -> Self
    where
        F: Fn(&[Value]) -> Result<OpDefinition> + Send + Sync + 'static,
    {
        Self::Parameterized {
            kind,
            signature,
            factory: Arc::new(factory),
        }
    }

    /// Kind of operator this definition produces
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Unary(_) => OpKind::Unary,
            Self::Binary(_) => OpKind::Binary,
            Self::IndexUnary(_) => OpKind::IndexUnary,
            Self::Select(_) => OpKind::Select,
            Self::Monoid { .. } => OpKind::Monoid,
            Self::Semiring { .. } => OpKind::Semiring,
            Self::Parameterized { kind, .. } => *kind,
        }
    }
}
