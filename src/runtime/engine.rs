//! The compute engine contract

use crate::container::{Shape, Sparse};
use crate::descriptor::{Descriptor, DescriptorFlags, OptionValue};
use crate::dtype::{DType, Value};
use crate::error::EngineErrorKind;
use crate::ops::TypedOp;
use std::fmt;

/// Opaque identifier of an engine-owned resource
pub type RawHandle = u64;

/// Failure reported by an engine, before the core attaches context
#[derive(Clone, Debug, PartialEq)]
pub struct EngineFailure {
    /// Mapped failure kind
    pub kind: EngineErrorKind,
    /// Engine message
    pub message: String,
}

impl EngineFailure {
    /// Create a failure
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Which combinator an invocation runs
#[derive(Clone, Debug, PartialEq)]
pub enum Method {
    /// Union of patterns; the operator combines overlaps
    EwiseAdd,
    /// Intersection of patterns
    EwiseMult,
    /// Union of patterns; missing sides are filled before combining
    EwiseUnion {
        /// Fill for positions only the right input has
        left: Value,
        /// Fill for positions only the left input has
        right: Value,
    },
    /// Unary operator on every entry
    Apply,
    /// Binary operator with a scalar bound as the first argument
    ApplyBindFirst(Value),
    /// Binary operator with a scalar bound as the second argument
    ApplyBindSecond(Value),
    /// Index-unary operator on every entry
    ApplyIndex {
        /// Thunk scalar
        thunk: Value,
    },
    /// Keep the entries an index-unary predicate accepts
    Select {
        /// Thunk scalar
        thunk: Value,
    },
    /// Matrix-matrix multiply over a semiring
    Mxm,
    /// Matrix-vector multiply over a semiring
    Mxv,
    /// Vector-matrix multiply over a semiring
    Vxm,
    /// Reduce every entry to a scalar with a monoid
    Reduce,
    /// Reduce each row to a vector entry
    ReduceRowwise,
    /// Reduce each column to a vector entry
    ReduceColumnwise,
    /// Copy the input (a scalar input fills every position)
    Assign,
}

impl Method {
    /// Name of the combinator (e.g. `ewise_add`)
    pub fn name(&self) -> &'static str {
        match self {
            Self::EwiseAdd => "ewise_add",
            Self::EwiseMult => "ewise_mult",
            Self::EwiseUnion { .. } => "ewise_union",
            Self::Apply | Self::ApplyBindFirst(_) | Self::ApplyBindSecond(_) | Self::ApplyIndex { .. } => {
                "apply"
            }
            Self::Select { .. } => "select",
            Self::Mxm => "mxm",
            Self::Mxv => "mxv",
            Self::Vxm => "vxm",
            Self::Reduce => "reduce",
            Self::ReduceRowwise => "reduce_rowwise",
            Self::ReduceColumnwise => "reduce_columnwise",
            Self::Assign => "assign",
        }
    }
}

/// One fully-resolved operation handed to an engine
///
/// The engine computes the operation result `T` (of `dtype` and `shape`) from
/// `inputs`, honouring the transpose flags of `descriptor`. Without `output`
/// it returns `T`. With `output` it returns the new contents of the output
/// after writing `T` through `mask`, `accum`, and the replace flag.
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    /// Combinator
    pub method: &'a Method,
    /// Typed operator; `None` only for plain assignment
    pub op: Option<&'a TypedOp>,
    /// Input containers, in argument order
    pub inputs: &'a [&'a Sparse],
    /// Execution flags; `None` means all flags off
    pub descriptor: Option<&'a Descriptor>,
    /// Element type of the result
    pub dtype: DType,
    /// Shape of the result
    pub shape: Shape,
    /// Current contents of the output, when writing into one
    pub output: Option<&'a Sparse>,
    /// Mask container; its flags come from the descriptor
    pub mask: Option<&'a Sparse>,
    /// Accumulator, typed on (output dtype, result dtype)
    pub accum: Option<&'a TypedOp>,
}

impl Invocation<'_> {
    /// Descriptor flags, all off without a descriptor
    pub fn flags(&self) -> DescriptorFlags {
        self.descriptor.map(|d| d.flags()).unwrap_or_default()
    }
}

/// A compute engine
///
/// The core resolves operators, canonicalizes descriptors, and schedules
/// work; the engine executes it. Engine-owned resources are returned as
/// [`RawHandle`]s and released through [`Engine::free`], which the core calls
/// at most once per handle via [`EngineHandle`](super::EngineHandle).
pub trait Engine: Send + Sync {
    /// Backend name used in error messages
    fn name(&self) -> &str;

    /// Whether descriptors may carry backend-specific extension options
    fn supports_descriptor_options(&self) -> bool {
        false
    }

    /// Create a descriptor carrying extension options
    fn new_descriptor(
        &self,
        flags: DescriptorFlags,
        options: &[(String, OptionValue)],
    ) -> Result<RawHandle, EngineFailure>;

    /// Execute one operation
    fn invoke(&self, call: &Invocation<'_>) -> Result<Sparse, EngineFailure>;

    /// Release an engine-owned resource
    fn free(&self, handle: RawHandle);

    /// Whether the engine has been shut down; frees are skipped afterwards
    fn is_shut_down(&self) -> bool {
        false
    }
}
