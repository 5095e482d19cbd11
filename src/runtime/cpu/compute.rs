//! Reference implementations of every combinator

use crate::container::{Mask, Shape, Sparse};
use crate::dtype::Value;
use crate::error::EngineErrorKind;
use crate::ops::{KernelHandle, Position, TypedOp};
use crate::runtime::{EngineFailure, Invocation, Method};
use std::borrow::Cow;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

type Entries = BTreeMap<Position, Value>;

/// Compute the operation result and, with an output, write it through mask and accumulator
pub(super) fn execute(call: &Invocation<'_>, max_entries: usize) -> Result<Sparse, EngineFailure> {
    let flags = call.flags();
    let inputs: Vec<Cow<'_, Sparse>> = call
        .inputs
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let transpose = (i == 0 && flags.transpose_first) || (i == 1 && flags.transpose_second);
            if transpose {
                Cow::Owned(s.transposed())
            } else {
                Cow::Borrowed(*s)
            }
        })
        .collect();

    let entries = compute(call, &inputs, max_entries)?;
    check_size(entries.len(), max_entries)?;
    let mut result = Sparse::new(call.dtype, call.shape);
    for (p, v) in entries {
        result.put(p, v);
    }
    let Some(output) = call.output else {
        return Ok(result);
    };
    let written = write(call, output, result)?;
    check_size(written.nvals(), max_entries)?;
    Ok(written)
}

fn compute(call: &Invocation<'_>, inputs: &[Cow<'_, Sparse>], max_entries: usize) -> Result<Entries, EngineFailure> {
    let method = call.method;
    match method {
        Method::EwiseAdd => {
            let (a, b) = two(method, inputs)?;
            same_shape(method, a.shape(), b.shape())?;
            expect_shape(call, a.shape())?;
            let k = kernel(call)?;
            let mut out: Entries = a.iter().collect();
            for (p, y) in b.iter() {
                let v = match out.get(&p) {
                    Some(&x) => binary(k, x, y, p, p)?,
                    None => y,
                };
                out.insert(p, v);
            }
            Ok(out)
        }
        Method::EwiseMult => {
            let (a, b) = two(method, inputs)?;
            same_shape(method, a.shape(), b.shape())?;
            expect_shape(call, a.shape())?;
            let k = kernel(call)?;
            let mut out = Entries::new();
            for (p, x) in a.iter() {
                if let Some(y) = b.get(p) {
                    out.insert(p, binary(k, x, y, p, p)?);
                }
            }
            Ok(out)
        }
        Method::EwiseUnion { left, right } => {
            let (a, b) = two(method, inputs)?;
            same_shape(method, a.shape(), b.shape())?;
            expect_shape(call, a.shape())?;
            let k = kernel(call)?;
            let mut out = Entries::new();
            for (p, x) in a.iter() {
                let y = b.get(p).unwrap_or(*right);
                out.insert(p, binary(k, x, y, p, p)?);
            }
            for (p, y) in b.iter() {
                if a.get(p).is_none() {
                    out.insert(p, binary(k, *left, y, p, p)?);
                }
            }
            Ok(out)
        }
        Method::Apply => {
            let a = one(method, inputs)?;
            expect_shape(call, a.shape())?;
            let k = kernel(call)?;
            let mut out = Entries::new();
            for (p, x) in a.iter() {
                out.insert(p, k.call_unary(x).ok_or_else(|| wrong_kernel(k, "unary"))?);
            }
            Ok(out)
        }
        Method::ApplyBindFirst(s) => {
            let a = one(method, inputs)?;
            expect_shape(call, a.shape())?;
            let k = kernel(call)?;
            let mut out = Entries::new();
            for (p, x) in a.iter() {
                out.insert(p, binary(k, *s, x, p, p)?);
            }
            Ok(out)
        }
        Method::ApplyBindSecond(s) => {
            let a = one(method, inputs)?;
            expect_shape(call, a.shape())?;
            let k = kernel(call)?;
            let mut out = Entries::new();
            for (p, x) in a.iter() {
                out.insert(p, binary(k, x, *s, p, p)?);
            }
            Ok(out)
        }
        Method::ApplyIndex { thunk } => {
            let a = one(method, inputs)?;
            expect_shape(call, a.shape())?;
            let k = kernel(call)?;
            let mut out = Entries::new();
            for (p, x) in a.iter() {
                out.insert(p, index_unary(k, x, p, *thunk)?);
            }
            Ok(out)
        }
        Method::Select { thunk } => {
            let a = one(method, inputs)?;
            expect_shape(call, a.shape())?;
            let k = kernel(call)?;
            let mut out = Entries::new();
            for (p, x) in a.iter() {
                if index_unary(k, x, p, *thunk)?.truthy() {
                    out.insert(p, x);
                }
            }
            Ok(out)
        }
        Method::Mxm => {
            let (a, b) = two(method, inputs)?;
            let (Shape::Matrix(m, ka), Shape::Matrix(kb, n)) = (a.shape(), b.shape()) else {
                return Err(dimension(method, a.shape(), b.shape()));
            };
            if ka != kb {
                return Err(dimension(method, a.shape(), b.shape()));
            }
            expect_shape(call, Shape::Matrix(m, n))?;
            let op = typed(call)?;
            let rows = by_row(b);
            let mut out = Entries::new();
            for (pa, x) in a.iter() {
                let Some(row) = rows.get(&pa.col) else {
                    continue;
                };
                for &(j, y) in row {
                    let pb = Position::matrix(pa.col, j);
                    let prod = binary(op.kernel(), x, y, pa, pb)?;
                    accumulate(op, &mut out, Position::matrix(pa.row, j), prod)?;
                }
            }
            Ok(out)
        }
        Method::Mxv => {
            let (a, v) = two(method, inputs)?;
            let (Shape::Matrix(m, k), Shape::Vector(n)) = (a.shape(), v.shape()) else {
                return Err(dimension(method, a.shape(), v.shape()));
            };
            if k != n {
                return Err(dimension(method, a.shape(), v.shape()));
            }
            expect_shape(call, Shape::Vector(m))?;
            let op = typed(call)?;
            let mut out = Entries::new();
            for (pa, x) in a.iter() {
                if let Some(y) = v.get(Position::vector(pa.col)) {
                    let prod = binary(op.kernel(), x, y, pa, Position::vector(pa.col))?;
                    accumulate(op, &mut out, Position::vector(pa.row), prod)?;
                }
            }
            Ok(out)
        }
        Method::Vxm => {
            let (v, a) = two(method, inputs)?;
            let (Shape::Vector(n), Shape::Matrix(k, m)) = (v.shape(), a.shape()) else {
                return Err(dimension(method, v.shape(), a.shape()));
            };
            if k != n {
                return Err(dimension(method, v.shape(), a.shape()));
            }
            expect_shape(call, Shape::Vector(m))?;
            let op = typed(call)?;
            let rows = by_row(a);
            let mut out = Entries::new();
            for (pv, x) in v.iter() {
                let Some(row) = rows.get(&pv.row) else {
                    continue;
                };
                for &(j, y) in row {
                    let prod = binary(
                        op.kernel(),
                        x,
                        y,
                        Position::matrix(0, pv.row),
                        Position::matrix(pv.row, j),
                    )?;
                    accumulate(op, &mut out, Position::vector(j), prod)?;
                }
            }
            Ok(out)
        }
        Method::Reduce => {
            let a = one(method, inputs)?;
            expect_shape(call, Shape::Scalar)?;
            let k = kernel(call)?;
            let mut acc: Option<Value> = None;
            for (p, x) in a.iter() {
                acc = Some(match acc {
                    Some(prev) => binary(k, prev, x, p, p)?,
                    None => x,
                });
            }
            Ok(acc.map(|v| (Position::default(), v)).into_iter().collect())
        }
        Method::ReduceRowwise | Method::ReduceColumnwise => {
            let a = one(method, inputs)?;
            let Shape::Matrix(m, n) = a.shape() else {
                return Err(dimension(method, a.shape(), call.shape));
            };
            let rowwise = matches!(method, Method::ReduceRowwise);
            expect_shape(call, Shape::Vector(if rowwise { m } else { n }))?;
            let k = kernel(call)?;
            let mut out = Entries::new();
            for (p, x) in a.iter() {
                let at = Position::vector(if rowwise { p.row } else { p.col });
                match out.entry(at) {
                    Entry::Occupied(mut e) => {
                        let v = binary(k, *e.get(), x, p, p)?;
                        e.insert(v);
                    }
                    Entry::Vacant(e) => {
                        e.insert(x);
                    }
                }
            }
            Ok(out)
        }
        Method::Assign => {
            let a = one(method, inputs)?;
            if a.shape() == call.shape {
                return Ok(a.iter().collect());
            }
            if a.shape() != Shape::Scalar {
                return Err(dimension(method, a.shape(), call.shape));
            }
            let Some(value) = a.get(Position::default()) else {
                return Ok(Entries::new());
            };
            if call.shape.capacity() > max_entries as u128 {
                return Err(EngineFailure::new(
                    EngineErrorKind::OutOfMemory,
                    format!("filling {} positions exceeds the engine limit", call.shape.capacity()),
                ));
            }
            Ok(dense_positions(call.shape).map(|p| (p, value)).collect())
        }
    }
}

/// Write `t` into `output`: accumulate, then mask, then replace
fn write(call: &Invocation<'_>, output: &Sparse, t: Sparse) -> Result<Sparse, EngineFailure> {
    if output.shape() != t.shape() {
        return Err(dimension(call.method, output.shape(), t.shape()));
    }
    let flags = call.flags();

    let z: Entries = match call.accum {
        Some(accum) => {
            let mut z: Entries = output.iter().collect();
            for (p, y) in t.iter() {
                let v = match z.get(&p) {
                    Some(&x) => binary(accum.kernel(), x, y, p, p)?,
                    None => y,
                };
                z.insert(p, v);
            }
            z
        }
        None => t.into_entries(),
    };

    let mut out = Sparse::new(output.dtype(), output.shape());
    match call.mask {
        None => {
            for (p, v) in z {
                out.put(p, v);
            }
        }
        Some(mask) => {
            if mask.shape() != output.shape() {
                return Err(dimension(call.method, mask.shape(), output.shape()));
            }
            let allows = |p: Position| {
                Mask::allows_with(mask, flags.mask_structure, flags.mask_complement, p)
            };
            for (p, v) in z {
                if allows(p) {
                    out.put(p, v);
                }
            }
            if !flags.output_replace {
                for (p, v) in output.iter() {
                    if !allows(p) {
                        out.put(p, v);
                    }
                }
            }
        }
    }
    Ok(out)
}

fn check_size(n: usize, max_entries: usize) -> Result<(), EngineFailure> {
    if n > max_entries {
        Err(EngineFailure::new(
            EngineErrorKind::OutOfMemory,
            format!("result of {n} entries exceeds the engine limit of {max_entries}"),
        ))
    } else {
        Ok(())
    }
}

fn one<'s>(method: &Method, inputs: &'s [Cow<'_, Sparse>]) -> Result<&'s Sparse, EngineFailure> {
    match inputs {
        [a] => Ok(a),
        _ => Err(arity(method, 1, inputs.len())),
    }
}

fn two<'s>(
    method: &Method,
    inputs: &'s [Cow<'_, Sparse>],
) -> Result<(&'s Sparse, &'s Sparse), EngineFailure> {
    match inputs {
        [a, b] => Ok((a, b)),
        _ => Err(arity(method, 2, inputs.len())),
    }
}

fn arity(method: &Method, expected: usize, got: usize) -> EngineFailure {
    EngineFailure::new(
        EngineErrorKind::InvalidValue,
        format!("{} takes {expected} input(s), got {got}", method.name()),
    )
}

fn typed<'c>(call: &Invocation<'c>) -> Result<&'c TypedOp, EngineFailure> {
    call.op.ok_or_else(|| {
        EngineFailure::new(
            EngineErrorKind::InvalidValue,
            format!("{} requires an operator", call.method.name()),
        )
    })
}

fn kernel<'c>(call: &Invocation<'c>) -> Result<&'c KernelHandle, EngineFailure> {
    typed(call).map(|op| op.kernel())
}

fn wrong_kernel(k: &KernelHandle, expected: &str) -> EngineFailure {
    EngineFailure::new(
        EngineErrorKind::DomainMismatch,
        format!("kernel {} is not {expected}", k.name()),
    )
}

fn binary(k: &KernelHandle, x: Value, y: Value, px: Position, py: Position) -> Result<Value, EngineFailure> {
    k.call_binary(x, y, px, py).ok_or_else(|| wrong_kernel(k, "binary"))
}

fn index_unary(k: &KernelHandle, x: Value, p: Position, thunk: Value) -> Result<Value, EngineFailure> {
    k.call_index_unary(x, p, thunk)
        .ok_or_else(|| wrong_kernel(k, "index-unary"))
}

/// Fold `prod` into `out[at]` with the semiring's additive monoid
fn accumulate(op: &TypedOp, out: &mut Entries, at: Position, prod: Value) -> Result<(), EngineFailure> {
    let add = op.add().ok_or_else(|| {
        EngineFailure::new(
            EngineErrorKind::DomainMismatch,
            format!("{} is not a semiring", op.name()),
        )
    })?;
    match out.entry(at) {
        Entry::Occupied(mut e) => {
            let v = binary(&add.kernel, *e.get(), prod, at, at)?;
            e.insert(v);
        }
        Entry::Vacant(e) => {
            e.insert(prod);
        }
    }
    Ok(())
}

fn by_row(m: &Sparse) -> BTreeMap<u64, Vec<(u64, Value)>> {
    let mut rows: BTreeMap<u64, Vec<(u64, Value)>> = BTreeMap::new();
    for (p, v) in m.iter() {
        rows.entry(p.row).or_default().push((p.col, v));
    }
    rows
}

fn dense_positions(shape: Shape) -> Box<dyn Iterator<Item = Position>> {
    match shape {
        Shape::Scalar => Box::new(std::iter::once(Position::default())),
        Shape::Vector(n) => Box::new((0..n).map(Position::vector)),
        Shape::Matrix(r, c) => Box::new((0..r).flat_map(move |i| (0..c).map(move |j| Position::matrix(i, j)))),
    }
}

fn same_shape(method: &Method, a: Shape, b: Shape) -> Result<(), EngineFailure> {
    if a == b {
        Ok(())
    } else {
        Err(dimension(method, a, b))
    }
}

fn expect_shape(call: &Invocation<'_>, shape: Shape) -> Result<(), EngineFailure> {
    same_shape(call.method, shape, call.shape)
}

fn dimension(method: &Method, a: Shape, b: Shape) -> EngineFailure {
    EngineFailure::new(
        EngineErrorKind::DimensionMismatch,
        format!("{}: {a} vs {b}", method.name()),
    )
}
