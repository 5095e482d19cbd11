//! Error types for graphalg

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using graphalg's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of failure reported by a compute engine
///
/// Engine status codes are mapped onto these kinds so callers can
/// special-case them without inspecting engine-specific codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    /// The engine could not allocate the result
    OutOfMemory,
    /// An input value was rejected by the kernel
    InvalidValue,
    /// Operand dtypes are incompatible with the kernel domain
    DomainMismatch,
    /// Operand shapes are incompatible
    DimensionMismatch,
    /// An index fell outside a container
    IndexOutOfBounds,
    /// A user-defined kernel panicked
    Panic,
    /// Any other engine failure
    Other,
}

impl std::fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OutOfMemory => "out of memory",
            Self::InvalidValue => "invalid value",
            Self::DomainMismatch => "domain mismatch",
            Self::DimensionMismatch => "dimension mismatch",
            Self::IndexOutOfBounds => "index out of bounds",
            Self::Panic => "kernel panic",
            Self::Other => "engine failure",
        };
        f.write_str(s)
    }
}

/// Errors that can occur in graphalg operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No native or coercible kernel exists for the requested type(s)
    #[error("{op} does not work with {requested}")]
    NoMatchingKernel {
        /// Operator name
        op: String,
        /// Requested type key, rendered
        requested: String,
    },

    /// Linking parameterized operators with different parameter signatures
    #[error("Signatures of {left} and {right} must match: ({left_sig}) vs ({right_sig})")]
    SignatureMismatch {
        /// Name of the first operator
        left: String,
        /// Name of the second operator
        right: String,
        /// Rendered signature of the first operator
        left_sig: String,
        /// Rendered signature of the second operator
        right_sig: String,
    },

    /// A name is already bound to an operator of an incompatible kind
    #[error("{path} is already defined as a {existing} operator; cannot register a {requested}")]
    DuplicateName {
        /// Dotted path of the name
        path: String,
        /// Kind already bound
        existing: &'static str,
        /// Kind requested
        requested: &'static str,
    },

    /// A leaf would replace a namespace node or vice versa
    #[error("{path} is already defined: {reason}")]
    PathConflict {
        /// Dotted path of the conflict
        path: String,
        /// What is already there
        reason: String,
    },

    /// A monoid identity is incompatible with its binary operator's domain
    #[error("Domain mismatch for {op}: {reason}")]
    DomainMismatch {
        /// Operator name
        op: String,
        /// Description of the mismatch
        reason: String,
    },

    /// A kernel table entry is inconsistent with its key or kind
    #[error("Bad kernel for {op}: {reason}")]
    BadKernel {
        /// Operator name
        op: String,
        /// Description of the problem
        reason: String,
    },

    /// A deferred expression refused to materialize, or was mutated in place
    #[error(
        "{attr} not enabled for objects of type {expr_type}.  Use `.new()` to create a new {output_type}.\n\nHint: use `Context::set_autocompute(true)` to enable automatic computation of expressions."
    )]
    MaterializationRefused {
        /// The accessor or operator that was refused
        attr: String,
        /// Type name of the expression
        expr_type: String,
        /// Type name the expression would produce
        output_type: &'static str,
    },

    /// `==` on a deferred expression
    #[error(
        "== not enabled for objects of type {expr_type}.  Use `.new()` to create a new {output_type}, then use `.isequal` method."
    )]
    EqualityRefused {
        /// Type name of the expression
        expr_type: String,
        /// Type name the expression would produce
        output_type: &'static str,
    },

    /// Descriptor options that the active backend cannot honour
    #[error("{reason}")]
    UnsupportedOption {
        /// Option names involved
        options: Vec<String>,
        /// Active backend name
        backend: String,
        /// Full message
        reason: String,
    },

    /// Generic type error
    #[error("{0}")]
    InvalidType(String),

    /// Generic value error
    #[error("{0}")]
    InvalidValue(String),

    /// Lookup of a name that is not registered
    #[error("Unknown {kind} operator: {name}")]
    UnknownOperator {
        /// Kind searched
        kind: &'static str,
        /// Requested name
        name: String,
    },

    /// A reserved name whose kernels were never bound
    #[error("{name} is reserved but has not been bound to kernels yet")]
    UnboundOperator {
        /// Dotted name
        name: String,
    },

    /// Commute link would overwrite an existing different link
    #[error("{op} already commutes to {existing}; cannot commute to {requested}")]
    CommuteConflict {
        /// Operator name
        op: String,
        /// Existing commute partner
        existing: String,
        /// Requested commute partner
        requested: String,
    },

    /// Shapes of operands are incompatible
    #[error("Dimension mismatch in {op}: {lhs:?} vs {rhs:?}")]
    DimensionMismatch {
        /// Operation name
        op: &'static str,
        /// Left shape
        lhs: Vec<u64>,
        /// Right shape
        rhs: Vec<u64>,
    },

    /// Index out of bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: u64,
        /// Size of the dimension
        size: u64,
    },

    /// A failure reported by the compute engine
    #[error("{backend} {kind}{}: {message}", while_computing(.container))]
    Engine {
        /// Mapped failure kind
        kind: EngineErrorKind,
        /// Engine name
        backend: String,
        /// Name of the acting container, if known
        container: Option<String>,
        /// Engine message
        message: String,
    },
}

fn while_computing(container: &Option<String>) -> String {
    container
        .as_deref()
        .map(|c| format!(" (while computing {c})"))
        .unwrap_or_default()
}

impl Error {
    /// Create a no-matching-kernel error
    pub fn no_matching_kernel(op: &str, requested: impl std::fmt::Display) -> Self {
        Self::NoMatchingKernel {
            op: op.to_string(),
            requested: requested.to_string(),
        }
    }

    /// Create a dtype-specific no-matching-kernel error
    pub fn unsupported_dtype(op: &str, dtype: DType) -> Self {
        Self::no_matching_kernel(op, dtype.name())
    }

    /// Create a generic type error
    pub fn invalid_type(msg: impl Into<String>) -> Self {
        Self::InvalidType(msg.into())
    }

    /// Create a generic value error
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Create a path conflict error
    pub fn path_conflict(path: &str, reason: impl Into<String>) -> Self {
        Self::PathConflict {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(op: &'static str, lhs: &[u64], rhs: &[u64]) -> Self {
        Self::DimensionMismatch {
            op,
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    /// True for errors that mean "the engine ran out of memory"
    pub fn is_out_of_memory(&self) -> bool {
        matches!(
            self,
            Self::Engine {
                kind: EngineErrorKind::OutOfMemory,
                ..
            }
        )
    }

    /// True for the type-error family (`MaterializationRefused`, `EqualityRefused`, `InvalidType`)
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            Self::MaterializationRefused { .. } | Self::EqualityRefused { .. } | Self::InvalidType(_)
        )
    }

    /// True for the value-error family, including engine-reported invalid values
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidValue(_)
                | Self::UnsupportedOption { .. }
                | Self::SignatureMismatch { .. }
                | Self::Engine {
                    kind: EngineErrorKind::InvalidValue,
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_message_names_container() {
        let err = Error::Engine {
            kind: EngineErrorKind::OutOfMemory,
            backend: "cpu".into(),
            container: Some("v_0".into()),
            message: "allocation failed".into(),
        };
        assert!(err.is_out_of_memory());
        let msg = err.to_string();
        assert!(msg.contains("v_0"), "{msg}");
        assert!(msg.contains("out of memory"), "{msg}");
    }

    #[test]
    fn test_engine_error_without_container() {
        let err = Error::Engine {
            kind: EngineErrorKind::Other,
            backend: "cpu".into(),
            container: None,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "cpu engine failure: boom");
        assert!(!err.is_out_of_memory());
    }

    #[test]
    fn test_error_families() {
        assert!(Error::invalid_type("x").is_type_error());
        assert!(Error::invalid_value("x").is_value_error());
        assert!(!Error::invalid_value("x").is_type_error());
    }
}
