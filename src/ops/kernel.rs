//! Type-specialized kernels
//!
//! A kernel is the concrete unit of computation the compute engine executes.
//! Kernels are created once (at registration or currying time), shared via
//! [`KernelHandle`], and compared by identity.

use super::kind::TypeKey;
use crate::dtype::{DType, Value};
use std::fmt;
use std::sync::Arc;

/// Position of an entry inside its container
///
/// Vectors use `col == 0`. Positions order row-major.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Row (or vector) index
    pub row: u64,
    /// Column index
    pub col: u64,
}

impl Position {
    /// Position of a vector entry
    #[inline]
    pub const fn vector(index: u64) -> Self {
        Self { row: index, col: 0 }
    }

    /// Position of a matrix entry
    #[inline]
    pub const fn matrix(row: u64, col: u64) -> Self {
        Self { row, col }
    }
}

/// Element-wise function of one value
pub type UnaryFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
/// Element-wise function of two values
pub type BinaryFn = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;
/// Function of the positions of the two inputs (values are ignored)
pub type PositionalFn = Arc<dyn Fn(Position, Position) -> Value + Send + Sync>;
/// Function of a value, its position, and a thunk scalar
pub type IndexUnaryFn = Arc<dyn Fn(Value, Position, Value) -> Value + Send + Sync>;

/// The callable body of a kernel
#[derive(Clone)]
pub enum KernelFn {
    /// `f(x)`
    Unary(UnaryFn),
    /// `f(x, y)`
    Binary(BinaryFn),
    /// `f(pos_x, pos_y)`
    Positional(PositionalFn),
    /// `f(x, pos, thunk)`
    IndexUnary(IndexUnaryFn),
}

impl KernelFn {
    /// Number of value inputs
    pub fn arity(&self) -> usize {
        match self {
            Self::Unary(_) | Self::IndexUnary(_) => 1,
            Self::Binary(_) | Self::Positional(_) => 2,
        }
    }
}

struct KernelInner {
    name: String,
    input: TypeKey,
    output: DType,
    func: KernelFn,
}

/// Shared handle to a type-specialized kernel
///
/// Two handles are equal only if they refer to the same kernel instance.
#[derive(Clone)]
pub struct KernelHandle(Arc<KernelInner>);

impl KernelHandle {
    fn make(name: impl Into<String>, input: TypeKey, output: DType, func: KernelFn) -> Self {
        Self(Arc::new(KernelInner {
            name: name.into(),
            input,
            output,
            func,
        }))
    }

    /// Unary kernel over `input`
    pub fn unary<F>(name: impl Into<String>, input: DType, output: DType, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::make(name, TypeKey::Single(input), output, KernelFn::Unary(Arc::new(f)))
    }

    /// Binary kernel with both inputs of `input`
    pub fn binary<F>(name: impl Into<String>, input: DType, output: DType, f: F) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        Self::make(name, TypeKey::Single(input), output, KernelFn::Binary(Arc::new(f)))
    }

    /// Binary kernel with distinct left and right input types
    pub fn binary_mixed<F>(
        name: impl Into<String>,
        left: DType,
        right: DType,
        output: DType,
        f: F,
    ) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        Self::make(
            name,
            TypeKey::pair(left, right),
            output,
            KernelFn::Binary(Arc::new(f)),
        )
    }

    /// Positional binary kernel keyed by its output type
    pub fn positional<F>(name: impl Into<String>, output: DType, f: F) -> Self
    where
        F: Fn(Position, Position) -> Value + Send + Sync + 'static,
    {
        Self::make(
            name,
            TypeKey::Single(output),
            output,
            KernelFn::Positional(Arc::new(f)),
        )
    }

    /// Index-unary kernel over `input`
    pub fn index_unary<F>(name: impl Into<String>, input: DType, output: DType, f: F) -> Self
    where
        F: Fn(Value, Position, Value) -> Value + Send + Sync + 'static,
    {
        Self::make(
            name,
            TypeKey::Single(input),
            output,
            KernelFn::IndexUnary(Arc::new(f)),
        )
    }

    /// Kernel name (e.g. `plus_INT64`)
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Declared input type key
    pub fn input(&self) -> TypeKey {
        self.0.input
    }

    /// Declared output type
    pub fn output(&self) -> DType {
        self.0.output
    }

    /// Callable body
    pub fn func(&self) -> &KernelFn {
        &self.0.func
    }

    /// Identity comparison
    #[inline]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Evaluate a unary kernel, casting in and out
    pub fn call_unary(&self, x: Value) -> Option<Value> {
        match &self.0.func {
            KernelFn::Unary(f) => Some(f(x.cast(self.0.input.left())).cast(self.0.output)),
            _ => None,
        }
    }

    /// Evaluate a binary or positional kernel, casting in and out
    pub fn call_binary(&self, x: Value, y: Value, px: Position, py: Position) -> Option<Value> {
        let out = match &self.0.func {
            KernelFn::Binary(f) => f(x.cast(self.0.input.left()), y.cast(self.0.input.right())),
            KernelFn::Positional(f) => f(px, py),
            _ => return None,
        };
        Some(out.cast(self.0.output))
    }

    /// Evaluate an index-unary kernel, casting in and out
    pub fn call_index_unary(&self, x: Value, pos: Position, thunk: Value) -> Option<Value> {
        match &self.0.func {
            KernelFn::IndexUnary(f) => {
                Some(f(x.cast(self.0.input.left()), pos, thunk).cast(self.0.output))
            }
            _ => None,
        }
    }
}

impl PartialEq for KernelHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelHandle")
            .field("name", &self.0.name)
            .field("input", &self.0.input)
            .field("output", &self.0.output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_kernel_casts_inputs_and_output() {
        let k = KernelHandle::binary("plus_INT8", DType::I8, DType::I8, |a, b| match (a, b) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
            _ => unreachable!(),
        });
        let out = k
            .call_binary(Value::Int(100), Value::Float(100.0), Position::default(), Position::default())
            .unwrap();
        assert_eq!(out, Value::Int(-56));
        assert!(k.call_unary(Value::Int(1)).is_none());
    }

    #[test]
    fn test_identity_equality() {
        let a = KernelHandle::unary("id", DType::I64, DType::I64, |x| x);
        let b = KernelHandle::unary("id", DType::I64, DType::I64, |x| x);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_positional_ignores_values() {
        let k = KernelHandle::positional("firsti_INT64", DType::I64, |px, _| Value::Int(px.row as i64));
        let out = k
            .call_binary(Value::Bool(true), Value::Bool(true), Position::matrix(3, 1), Position::matrix(1, 2))
            .unwrap();
        assert_eq!(out, Value::Int(3));
    }
}
