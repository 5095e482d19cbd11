//! Operator kinds, identifiers, and type keys

use crate::dtype::DType;
use std::fmt;

/// The six operator kinds held by the registry
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    /// `f(x)`
    Unary,
    /// `f(x, y)`
    Binary,
    /// Associative binary operator with an identity value
    Monoid,
    /// Additive monoid paired with a multiplicative binary operator
    Semiring,
    /// `f(x, i, j, thunk)`
    IndexUnary,
    /// Boolean index-unary predicate used to filter entries
    Select,
}

impl OpKind {
    /// All kinds, in namespace order
    pub const ALL: [OpKind; 6] = [
        OpKind::Unary,
        OpKind::Binary,
        OpKind::Monoid,
        OpKind::Semiring,
        OpKind::IndexUnary,
        OpKind::Select,
    ];

    /// Kinds searched by the combined `op` namespace, in precedence order
    pub const COMBINED: [OpKind; 4] = [
        OpKind::Unary,
        OpKind::Binary,
        OpKind::Monoid,
        OpKind::Semiring,
    ];

    /// Namespace name (`binary`, `monoid`, ...)
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::Binary => "binary",
            Self::Monoid => "monoid",
            Self::Semiring => "semiring",
            Self::IndexUnary => "indexunary",
            Self::Select => "select",
        }
    }

    /// Type name used in error messages (`BinaryOp`, `Monoid`, ...)
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Unary => "UnaryOp",
            Self::Binary => "BinaryOp",
            Self::Monoid => "Monoid",
            Self::Semiring => "Semiring",
            Self::IndexUnary => "IndexUnaryOp",
            Self::Select => "SelectOp",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Whether kernels of this kind take a left/right type pair
    pub const fn is_binary_like(self) -> bool {
        matches!(self, Self::Binary | Self::Monoid | Self::Semiring)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable identifier of an operator inside its [`Registry`](super::Registry)
///
/// Identifiers are never reused: two `OpId`s from the same registry are equal
/// exactly when they name the same operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub(crate) u32);

impl OpId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kernel table key: one element type, or an ordered left/right pair
///
/// Pairs with equal sides are always normalized to `Single`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKey {
    /// Same type on every input
    Single(DType),
    /// Distinct left and right input types
    Pair(DType, DType),
}

impl TypeKey {
    /// Normalizing constructor for a left/right pair
    pub fn pair(left: DType, right: DType) -> Self {
        if left == right {
            Self::Single(left)
        } else {
            Self::Pair(left, right)
        }
    }

    /// Left (or only) input type
    pub fn left(self) -> DType {
        match self {
            Self::Single(dt) | Self::Pair(dt, _) => dt,
        }
    }

    /// Right (or only) input type
    pub fn right(self) -> DType {
        match self {
            Self::Single(dt) | Self::Pair(_, dt) => dt,
        }
    }

    /// Key from one or two requested types
    pub fn from_slice(dtypes: &[DType]) -> Option<Self> {
        match *dtypes {
            [dt] => Some(Self::Single(dt)),
            [l, r] => Some(Self::pair(l, r)),
            _ => None,
        }
    }
}

impl From<DType> for TypeKey {
    fn from(dt: DType) -> Self {
        Self::Single(dt)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(dt) => write!(f, "{dt}"),
            Self::Pair(l, r) => write!(f, "({l}, {r})"),
        }
    }
}
