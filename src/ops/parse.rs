//! Parsing operator strings such as `"+"`, `"min.plus[FP64]"`, `"row<="`

use super::kind::{OpId, OpKind};
use super::registry::Registry;
use super::typed::TypedOp;
use crate::dtype::DType;
use crate::error::{Error, Result};

/// An operator named by a string, with an optional `[dtype]` suffix
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParsedOp {
    /// The operator
    pub op: OpId,
    /// Requested element type, if the string carried one
    pub dtype: Option<DType>,
}

impl ParsedOp {
    /// Typed view for the parsed dtype, if any
    pub fn typed(&self, registry: &Registry) -> Result<Option<TypedOp>> {
        self.dtype
            .map(|dt| registry.resolve(self.op, &[dt]))
            .transpose()
    }
}

fn symbol(kind: OpKind, s: &str) -> Option<&'static str> {
    match kind {
        OpKind::Unary => match s {
            "-" => Some("ainv"),
            "~" => Some("lnot"),
            _ => None,
        },
        OpKind::Binary => match s {
            "+" => Some("plus"),
            "-" => Some("minus"),
            "*" => Some("times"),
            "/" => Some("truediv"),
            "//" => Some("floordiv"),
            "%" => Some("numpy.mod"),
            "**" => Some("pow"),
            "==" => Some("eq"),
            "!=" => Some("ne"),
            "<" => Some("lt"),
            "<=" => Some("le"),
            ">" => Some("gt"),
            ">=" => Some("ge"),
            "&" => Some("land"),
            "|" => Some("lor"),
            "^" => Some("lxor"),
            _ => None,
        },
        OpKind::Monoid => match s {
            "+" => Some("plus"),
            "*" => Some("times"),
            "==" => Some("eq"),
            "&" => Some("land"),
            "|" => Some("lor"),
            "^" => Some("lxor"),
            _ => None,
        },
        OpKind::Semiring => None,
        OpKind::IndexUnary | OpKind::Select => match s {
            "==" => Some("valueeq"),
            "!=" => Some("valuene"),
            "<" => Some("valuelt"),
            "<=" => Some("valuele"),
            ">" => Some("valuegt"),
            ">=" => Some("valuege"),
            "row<=" => Some("rowle"),
            "row>" => Some("rowgt"),
            "col<=" => Some("colle"),
            "col>" => Some("colgt"),
            _ => None,
        },
    }
}

/// Split `"name[dtype]"` into its parts
fn split_dtype(s: &str, what: &str) -> Result<(String, Option<DType>)> {
    let lowered = s.trim().to_lowercase();
    let mut parts = lowered.split('[');
    let base = parts.next().unwrap_or_default().trim().to_string();
    let rest: Vec<&str> = parts.collect();
    if rest.len() > 1 {
        return Err(Error::invalid_value(format!(
            "Bad {what} string: {s:?}; contains too many \"[\""
        )));
    }
    if base.contains(']') {
        return Err(Error::invalid_value(format!(
            "Bad {what} string: {s:?}; \"]\" not matched by \"[\""
        )));
    }
    let dtype = match rest.first() {
        None => None,
        Some(d) => {
            let inner = d.strip_suffix(']').ok_or_else(|| {
                Error::invalid_value(format!("Bad {what} string: {s:?}; does not end with \"]\""))
            })?;
            Some(inner.trim().parse::<DType>()?)
        }
    };
    Ok((base, dtype))
}

impl Registry {
    /// Parse an operator string of one kind
    pub fn from_string(&self, kind: OpKind, s: &str) -> Result<ParsedOp> {
        let (base, dtype) = split_dtype(s, kind.name())?;
        let unknown = || Error::invalid_value(format!("Unknown {} string: {s:?}", kind.name()));
        let name = symbol(kind, &base).unwrap_or(base.as_str());
        if let Ok(op) = self.lookup(kind, name) {
            return Ok(ParsedOp { op, dtype });
        }
        if kind != OpKind::Semiring || !base.contains('.') {
            return Err(unknown());
        }
        let parts: Vec<&str> = base.split('.').collect();
        let [monoid, binary] = parts.as_slice() else {
            return Err(Error::invalid_value(format!("Bad semiring string: {s:?}")));
        };
        let monoid = self
            .from_string(OpKind::Monoid, monoid)
            .or_else(|_| self.from_string(OpKind::Binary, monoid))?;
        let binary = self.from_string(OpKind::Binary, binary)?;
        let op = self.get_semiring(monoid.op, binary.op)?;
        Ok(ParsedOp { op, dtype })
    }

    /// Parse a string naming an operator of any kind
    pub fn op_from_string(&self, s: &str) -> Result<ParsedOp> {
        split_dtype(s, "op")?;
        OpKind::COMBINED
            .iter()
            .chain(&[OpKind::IndexUnary, OpKind::Select])
            .find_map(|kind| self.from_string(*kind, s).ok())
            .ok_or_else(|| Error::invalid_value(format!("Unknown op string: {s:?}")))
    }
}
