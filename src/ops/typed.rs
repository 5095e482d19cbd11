//! Typed operator views

use super::kernel::KernelHandle;
use super::kind::{OpId, OpKind, TypeKey};
use super::registry::Registry;
use crate::dtype::{DType, Value};
use crate::error::Result;

/// Additive part of a typed semiring
#[derive(Clone, Debug)]
pub struct AddPart {
    /// Typed additive monoid
    pub monoid: OpId,
    /// Its binary kernel
    pub kernel: KernelHandle,
    /// Its identity at the semiring's output type
    pub identity: Value,
}

/// An operator specialized to one type key
///
/// Obtained from [`Registry::resolve`]. Typed views are plain values: holding
/// one does not keep its operator alive and resolving twice yields views
/// that share the same kernel handle.
#[derive(Clone, Debug)]
pub struct TypedOp {
    pub(crate) op: OpId,
    pub(crate) name: String,
    pub(crate) kind: OpKind,
    pub(crate) requested: TypeKey,
    pub(crate) key: TypeKey,
    pub(crate) coerced: bool,
    pub(crate) kernel: KernelHandle,
    pub(crate) identity: Option<Value>,
    pub(crate) add: Option<AddPart>,
    pub(crate) positional: bool,
}

impl TypedOp {
    /// Parent operator
    pub fn op(&self) -> OpId {
        self.op
    }

    /// Parent operator name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operator kind
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// Type key that was asked for
    pub fn requested(&self) -> TypeKey {
        self.requested
    }

    /// Declared type key whose kernel is used
    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    /// Whether the requested key was coerced to a wider declared key
    pub fn is_coerced(&self) -> bool {
        self.coerced
    }

    /// Kernel (the multiplicative kernel for semirings)
    pub fn kernel(&self) -> &KernelHandle {
        &self.kernel
    }

    /// Output type
    pub fn return_type(&self) -> DType {
        self.kernel.output()
    }

    /// Monoid identity (monoids only)
    pub fn identity(&self) -> Option<Value> {
        self.identity
    }

    /// Additive part (semirings only)
    pub fn add(&self) -> Option<&AddPart> {
        self.add.as_ref()
    }

    /// Whether the operator reads positions instead of values
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// The commuted operator, specialized to the swapped key
    pub fn commutes_to(&self, registry: &Registry) -> Result<Option<TypedOp>> {
        let Some(other) = registry.commutes_to(self.op)? else {
            return Ok(None);
        };
        let key = match self.requested {
            TypeKey::Pair(l, r) => TypeKey::Pair(r, l),
            single => single,
        };
        registry.resolve_key(other, key).map(Some)
    }

    /// The associated monoid at the same key, if it supports that key exactly
    pub fn monoid(&self, registry: &Registry) -> Result<Option<TypedOp>> {
        if self.kind != OpKind::Binary && self.kind != OpKind::Semiring {
            return Ok(None);
        }
        let Some(monoid) = registry.monoid_of(self.op)? else {
            return Ok(None);
        };
        let key = match self.kind {
            OpKind::Semiring => TypeKey::Single(self.return_type()),
            _ => self.key,
        };
        registry.resolve_exact(monoid, key)
    }

    /// The underlying binary operator at the same key
    pub fn binaryop(&self, registry: &Registry) -> Result<Option<TypedOp>> {
        if self.kind != OpKind::Monoid && self.kind != OpKind::Semiring {
            return Ok(None);
        }
        let Some(binary) = registry.binaryop_of(self.op)? else {
            return Ok(None);
        };
        registry.resolve_exact(binary, self.key)
    }
}
