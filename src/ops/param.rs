//! Parameter signatures for parameterized operators

use crate::dtype::Value;
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// One named parameter with an optional default
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Default value, if the parameter may be omitted
    pub default: Option<Value>,
}

/// Ordered list of parameters accepted by a parameterized operator
///
/// Two signatures are compatible only if names, order, and defaults all agree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ParamSignature {
    params: Vec<Param>,
}

impl ParamSignature {
    /// Empty signature
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a required parameter
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Append a parameter with a default value
    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Declared parameters
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Bind call arguments to positional values, filling defaults
    pub fn bind(&self, args: &Params) -> Result<Vec<Value>> {
        if args.positional.len() > self.params.len() {
            return Err(Error::invalid_value(format!(
                "expected at most {} parameters, got {}",
                self.params.len(),
                args.positional.len()
            )));
        }
        let mut bound: Vec<Option<Value>> = args.positional.iter().copied().map(Some).collect();
        bound.resize(self.params.len(), None);

        for (name, value) in &args.named {
            let idx = self
                .params
                .iter()
                .position(|p| &p.name == name)
                .ok_or_else(|| Error::invalid_value(format!("unexpected parameter {name:?}")))?;
            if bound[idx].is_some() {
                return Err(Error::invalid_value(format!(
                    "multiple values for parameter {name:?}"
                )));
            }
            bound[idx] = Some(*value);
        }

        bound
            .into_iter()
            .zip(&self.params)
            .map(|(v, p)| {
                v.or(p.default).ok_or_else(|| {
                    Error::invalid_value(format!("missing required parameter {:?}", p.name))
                })
            })
            .collect()
    }

    /// Render bound values as `name=value, ...`
    pub(crate) fn render(&self, bound: &[Value]) -> String {
        self.params
            .iter()
            .zip(bound)
            .map(|(p, v)| format!("{}={v}", p.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ParamSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match p.default {
                Some(d) => write!(f, "{}={d}", p.name)?,
                None => f.write_str(&p.name)?,
            }
        }
        f.write_str(")")
    }
}

/// Call arguments for currying a parameterized operator
#[derive(Clone, Debug, Default)]
pub struct Params {
    positional: SmallVec<[Value; 4]>,
    named: SmallVec<[(String, Value); 2]>,
}

impl Params {
    /// No arguments (every parameter takes its default)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a keyword argument
    pub fn kw(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isclose_sig() -> ParamSignature {
        ParamSignature::new()
            .optional("rel_tol", 1e-7)
            .optional("abs_tol", 0.0)
    }

    #[test]
    fn test_bind_defaults_and_keywords() {
        let sig = isclose_sig();
        let bound = sig.bind(&Params::new()).unwrap();
        assert_eq!(bound, vec![Value::Float(1e-7), Value::Float(0.0)]);

        let bound = sig.bind(&Params::new().kw("abs_tol", 0.5)).unwrap();
        assert_eq!(bound, vec![Value::Float(1e-7), Value::Float(0.5)]);

        let bound = sig.bind(&Params::new().arg(0.1)).unwrap();
        assert_eq!(bound[0], Value::Float(0.1));
    }

    #[test]
    fn test_bind_errors() {
        let sig = ParamSignature::new().required("x");
        assert!(sig.bind(&Params::new()).is_err());
        assert!(sig.bind(&Params::new().arg(1).arg(2)).is_err());
        assert!(sig.bind(&Params::new().arg(1).kw("x", 2)).is_err());
        assert!(sig.bind(&Params::new().kw("y", 2)).is_err());
    }

    #[test]
    fn test_signature_equality_includes_defaults() {
        let a = ParamSignature::new().optional("x", 0);
        let b = ParamSignature::new().required("x");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "(x=0)");
        assert_eq!(a.render(&[Value::Int(3)]), "x=3");
    }
}
