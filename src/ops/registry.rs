//! Operator registry
//!
//! The registry owns every operator: named operators live in one namespace
//! tree per [`OpKind`], anonymous ones (user-defined and curried instances)
//! only in the arena. Operators are addressed by [`OpId`] and never removed.
//!
//! All mutation happens under a single write lock, so each registration is
//! validated completely before anything becomes visible.

use super::definition::{Definition, Identity, KernelFactory};
use super::kernel::KernelHandle;
use super::kind::{OpId, OpKind, TypeKey};
use super::namespace::Namespace;
use super::param::{ParamSignature, Params};
use super::typed::{AddPart, TypedOp};
use crate::dtype::{can_cast_safely, coercion_target, DType, DTypeSet, Value};
use crate::error::{Error, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Clone)]
enum ParamSource {
    Kernels(KernelFactory),
    Monoid(Identity),
    Semiring,
}

struct Parameterized {
    signature: ParamSignature,
    source: ParamSource,
    memo: HashMap<Vec<Value>, OpId>,
}

struct Concrete {
    kernels: BTreeMap<TypeKey, KernelHandle>,
    identities: BTreeMap<DType, Value>,
}

enum Body {
    Reserved,
    Concrete(Concrete),
    Parameterized(Parameterized),
}

struct OpEntry {
    name: String,
    kind: OpKind,
    anonymous: bool,
    body: Body,
    commutes_to: Option<OpId>,
    /// binary: its monoid; semiring: its additive monoid
    monoid: Option<OpId>,
    /// monoid or semiring: its binary operator
    binaryop: Option<OpId>,
    positional: bool,
    idempotent: bool,
    parent: Option<OpId>,
}

impl OpEntry {
    fn new(name: &str, kind: OpKind, anonymous: bool, body: Body) -> Self {
        Self {
            name: name.to_string(),
            kind,
            anonymous,
            body,
            commutes_to: None,
            monoid: None,
            binaryop: None,
            positional: false,
            idempotent: false,
            parent: None,
        }
    }

    fn signature(&self) -> Option<&ParamSignature> {
        match &self.body {
            Body::Parameterized(p) => Some(&p.signature),
            _ => None,
        }
    }

    fn is_parameterized(&self) -> bool {
        matches!(self.body, Body::Parameterized(_))
    }

    fn concrete(&self) -> Result<&Concrete> {
        match &self.body {
            Body::Concrete(c) => Ok(c),
            Body::Reserved => Err(Error::UnboundOperator {
                name: self.name.clone(),
            }),
            Body::Parameterized(_) => Err(Error::invalid_type(format!(
                "{} is parameterized; call it with parameters first",
                self.name
            ))),
        }
    }

    fn leaf_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Snapshot of an operator's metadata
#[derive(Clone, Debug)]
pub struct OpInfo {
    /// Identifier
    pub id: OpId,
    /// Dotted name (or anonymous name)
    pub name: String,
    /// Kind
    pub kind: OpKind,
    /// Whether the operator is reachable through a namespace
    pub anonymous: bool,
    /// Operator equal to this one with arguments swapped
    pub commutes_to: Option<OpId>,
    /// Binary: its monoid. Semiring: its additive monoid.
    pub monoid: Option<OpId>,
    /// Monoid or semiring: its binary operator
    pub binaryop: Option<OpId>,
    /// Reads positions instead of values
    pub is_positional: bool,
    /// `op(x, x) == x` (monoids)
    pub is_idempotent: bool,
    /// Parameter signature if parameterized
    pub signature: Option<ParamSignature>,
    /// Parameterized operator this one was curried from
    pub parent: Option<OpId>,
    /// Whether kernels are bound (false only for reserved names)
    pub is_bound: bool,
}

impl OpInfo {
    /// `commutes_to == self`
    pub fn is_commutative(&self) -> bool {
        self.commutes_to == Some(self.id)
    }

    /// Whether the operator must be curried before use
    pub fn is_parameterized(&self) -> bool {
        self.signature.is_some()
    }
}

#[derive(Default)]
struct State {
    ops: Vec<OpEntry>,
    roots: [Namespace; 6],
    semirings: HashMap<(OpId, OpId), OpId>,
}

/// The operator registry
///
/// # Example
///
/// ```
/// use graphalg::prelude::*;
///
/// let registry = Registry::with_builtins()?;
/// let plus = registry.lookup(OpKind::Binary, "plus")?;
/// let typed = registry.resolve(plus, &[DType::I32])?;
/// assert_eq!(typed.return_type(), DType::I32);
/// # Ok::<(), graphalg::error::Error>(())
/// ```
pub struct Registry {
    state: RwLock<State>,
    coercions: Mutex<HashMap<OpId, BTreeMap<TypeKey, TypeKey>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("operators", &self.state.read().ops.len())
            .finish()
    }
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            coercions: Mutex::new(HashMap::new()),
        }
    }

    /// Registry populated with the builtin operator catalog
    pub fn with_builtins() -> Result<Self> {
        let registry = Self::new();
        super::builtins::install(&registry)?;
        Ok(registry)
    }

    /// Number of operators (named, anonymous, and curried)
    pub fn len(&self) -> usize {
        self.state.read().ops.len()
    }

    /// Whether the registry holds no operators
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register an operator under a dotted path in its kind's namespace
    pub fn register(&self, path: &str, definition: Definition) -> Result<OpId> {
        let mut st = self.state.write();
        let kind = definition.kind();
        st.check_name(kind, path, Some(&definition))?;
        let entry = st.build_entry(path, false, definition)?;
        let id = st.push(entry);
        st.roots[kind.index()].insert(path, id)?;
        st.link_new(id);
        log::debug!("registered {kind} operator {path}");
        Ok(id)
    }

    /// Register an operator outside every namespace
    pub fn register_anonymous(&self, name: &str, definition: Definition) -> Result<OpId> {
        let mut st = self.state.write();
        let entry = st.build_entry(name, true, definition)?;
        let id = st.push(entry);
        st.link_new(id);
        Ok(id)
    }

    /// Claim a name whose kernels will be bound later
    pub fn reserve(&self, kind: OpKind, path: &str) -> Result<OpId> {
        let mut st = self.state.write();
        st.check_name(kind, path, None)?;
        let id = st.push(OpEntry::new(path, kind, false, Body::Reserved));
        st.roots[kind.index()].insert(path, id)?;
        Ok(id)
    }

    /// Bind kernels to a reserved name
    pub fn bind(&self, id: OpId, definition: Definition) -> Result<()> {
        let mut st = self.state.write();
        let entry = st.entry(id)?;
        if !matches!(entry.body, Body::Reserved) {
            return Err(Error::invalid_value(format!("{} is already bound", entry.name)));
        }
        if definition.kind() != entry.kind {
            return Err(Error::DuplicateName {
                path: entry.name.clone(),
                existing: entry.kind.name(),
                requested: definition.kind().name(),
            });
        }
        let (name, anonymous) = (entry.name.clone(), entry.anonymous);
        let bound = st.build_entry(&name, anonymous, definition)?;
        st.ops[id.index()] = bound;
        st.link_new(id);
        log::debug!("bound reserved operator {name}");
        Ok(())
    }

    /// Declare that `a(x, y) == b(y, x)`; `a == b` marks `a` commutative
    pub fn link_commute(&self, a: OpId, b: OpId) -> Result<()> {
        let mut st = self.state.write();
        let (ea, eb) = (st.entry(a)?, st.entry(b)?);
        if ea.kind != eb.kind {
            return Err(Error::invalid_type(format!(
                "cannot commute {} {} with {} {}",
                ea.kind.type_name(),
                ea.name,
                eb.kind.type_name(),
                eb.name
            )));
        }
        check_signatures(ea, eb)?;
        for (x, y) in [(a, b), (b, a)] {
            if let Some(existing) = st.ops[x.index()].commutes_to {
                if existing != y {
                    return Err(Error::CommuteConflict {
                        op: st.ops[x.index()].name.clone(),
                        existing: st.ops[existing.index()].name.clone(),
                        requested: st.ops[y.index()].name.clone(),
                    });
                }
            }
        }
        st.set_commute(a, b);
        if st.ops[a.index()].kind == OpKind::Binary {
            let pairs: Vec<(OpId, OpId)> = st
                .semirings
                .iter()
                .filter(|((_, bin), _)| *bin == a)
                .filter_map(|((m, _), s)| st.semirings.get(&(*m, b)).map(|t| (*s, *t)))
                .collect();
            for (s, t) in pairs {
                st.try_commute(s, t);
            }
        }
        Ok(())
    }

    /// Make `monoid` the monoid of `binary`
    ///
    /// `monoid` must be built on `binary`; parameterized operators must share
    /// a signature. Existing curried instances of `binary` keep their links.
    pub fn attach_monoid(&self, binary: OpId, monoid: OpId) -> Result<()> {
        let mut st = self.state.write();
        let (eb, em) = (st.entry(binary)?, st.entry(monoid)?);
        expect_kind(eb, OpKind::Binary)?;
        expect_kind(em, OpKind::Monoid)?;
        if em.binaryop != Some(binary) {
            return Err(Error::invalid_value(format!(
                "{} is not built on {}",
                em.name, eb.name
            )));
        }
        check_signatures(eb, em)?;
        st.ops[binary.index()].monoid = Some(monoid);
        st.clear_memo(binary);
        Ok(())
    }

    /// Make `semiring` the semiring returned for its monoid/binary pair
    pub fn attach_semiring(&self, semiring: OpId) -> Result<()> {
        let mut st = self.state.write();
        let e = st.entry(semiring)?;
        expect_kind(e, OpKind::Semiring)?;
        let (Some(m), Some(b)) = (e.monoid, e.binaryop) else {
            return Err(Error::UnboundOperator { name: e.name.clone() });
        };
        st.semirings.insert((m, b), semiring);
        Ok(())
    }

    /// Curry a parameterized operator
    ///
    /// The same parameter values always return the same instance.
    pub fn curry(&self, id: OpId, params: &Params) -> Result<OpId> {
        let mut st = self.state.write();
        let entry = st.entry(id)?;
        let Some(signature) = entry.signature() else {
            return Err(Error::invalid_type(format!("{} is not parameterized", entry.name)));
        };
        let bound = signature.bind(params)?;
        st.curry_bound(id, bound)
    }

    /// The semiring combining `monoid` and `binary`, created on demand
    ///
    /// A binary operator with a monoid is accepted in the monoid slot, and a
    /// monoid in the binary slot stands for its binary operator.
    pub fn get_semiring(&self, monoid: OpId, binary: OpId) -> Result<OpId> {
        let mut st = self.state.write();
        let (em, eb) = (st.entry(monoid)?, st.entry(binary)?);
        let m = match (em.kind, eb.kind) {
            (OpKind::Monoid, _) => monoid,
            (OpKind::Binary, OpKind::Monoid) => {
                return Err(Error::invalid_type(format!(
                    "Expected a Monoid followed by a BinaryOp, got BinaryOp {} and Monoid {}; \
                     did you switch the monoid and binaryop?",
                    em.name, eb.name
                )))
            }
            (OpKind::Binary, _) => em.monoid.ok_or_else(|| {
                Error::invalid_type(format!(
                    "Expected type: Monoid; BinaryOp {} has no associated monoid",
                    em.name
                ))
            })?,
            (other, _) => {
                return Err(Error::invalid_type(format!(
                    "Expected type: Monoid, got {}",
                    other.type_name()
                )))
            }
        };
        let b = match eb.kind {
            OpKind::Binary => binary,
            OpKind::Monoid => eb
                .binaryop
                .ok_or_else(|| Error::UnboundOperator { name: eb.name.clone() })?,
            other => {
                return Err(Error::invalid_type(format!(
                    "Expected type: BinaryOp, got {}",
                    other.type_name()
                )))
            }
        };
        if let Some(&s) = st.semirings.get(&(m, b)) {
            return Ok(s);
        }
        let name = format!("{}_{}", st.ops[m.index()].leaf_name(), st.ops[b.index()].leaf_name());
        let entry = st.build_entry(&name, true, Definition::Semiring { monoid: m, binaryop: b })?;
        let id = st.push(entry);
        st.link_new(id);
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Find a named operator
    pub fn lookup(&self, kind: OpKind, path: &str) -> Result<OpId> {
        self.state.read().roots[kind.index()]
            .get(path)
            .ok_or_else(|| Error::UnknownOperator {
                kind: kind.name(),
                name: path.to_string(),
            })
    }

    /// Find a name in the combined `op` namespace (unary, binary, monoid,
    /// semiring, in that order)
    pub fn lookup_any(&self, path: &str) -> Result<OpId> {
        let st = self.state.read();
        OpKind::COMBINED
            .iter()
            .find_map(|k| st.roots[k.index()].get(path))
            .ok_or_else(|| Error::UnknownOperator {
                kind: "op",
                name: path.to_string(),
            })
    }

    /// Whether `path` is a namespace in `kind`'s tree
    pub fn is_namespace(&self, kind: OpKind, path: &str) -> bool {
        self.state.read().roots[kind.index()].is_namespace(path)
    }

    /// Every named operator of a kind, with its dotted path
    pub fn names(&self, kind: OpKind) -> Vec<(String, OpId)> {
        self.state.read().roots[kind.index()].leaves()
    }

    /// Metadata snapshot
    pub fn info(&self, id: OpId) -> Result<OpInfo> {
        let st = self.state.read();
        let e = st.entry(id)?;
        Ok(OpInfo {
            id,
            name: e.name.clone(),
            kind: e.kind,
            anonymous: e.anonymous,
            commutes_to: e.commutes_to,
            monoid: e.monoid,
            binaryop: e.binaryop,
            is_positional: e.positional,
            is_idempotent: e.idempotent,
            signature: e.signature().cloned(),
            parent: e.parent,
            is_bound: !matches!(e.body, Body::Reserved),
        })
    }

    /// Operator name
    pub fn name(&self, id: OpId) -> Result<String> {
        Ok(self.state.read().entry(id)?.name.clone())
    }

    /// Operator kind
    pub fn kind(&self, id: OpId) -> Result<OpKind> {
        Ok(self.state.read().entry(id)?.kind)
    }

    /// The commuted operator, if any
    pub fn commutes_to(&self, id: OpId) -> Result<Option<OpId>> {
        Ok(self.state.read().entry(id)?.commutes_to)
    }

    /// Binary: its monoid. Semiring: its additive monoid.
    pub fn monoid_of(&self, id: OpId) -> Result<Option<OpId>> {
        Ok(self.state.read().entry(id)?.monoid)
    }

    /// Monoid or semiring: its binary operator
    pub fn binaryop_of(&self, id: OpId) -> Result<Option<OpId>> {
        Ok(self.state.read().entry(id)?.binaryop)
    }

    /// Monoid identities by element type
    pub fn identities(&self, id: OpId) -> Result<BTreeMap<DType, Value>> {
        let st = self.state.read();
        Ok(st.entry(id)?.concrete()?.identities.clone())
    }

    /// Declared type keys
    pub fn native_types(&self, id: OpId) -> Result<Vec<TypeKey>> {
        let st = self.state.read();
        Ok(st.entry(id)?.concrete()?.kernels.keys().copied().collect())
    }

    /// Requested keys that were served by coercion, with their targets
    pub fn coercions(&self, id: OpId) -> BTreeMap<TypeKey, TypeKey> {
        self.coercions.lock().get(&id).cloned().unwrap_or_default()
    }

    /// Declared keys plus every coerced key recorded so far
    pub fn types(&self, id: OpId) -> Result<Vec<TypeKey>> {
        let mut keys = self.native_types(id)?;
        keys.extend(self.coercions(id).into_keys());
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// Whether `dtype` is served natively or by coercion (nothing is recorded)
    pub fn contains(&self, id: OpId, dtype: DType) -> bool {
        let st = self.state.read();
        let Ok(entry) = st.entry(id) else {
            return false;
        };
        match &entry.body {
            Body::Concrete(c) => find_key(&c.kernels, TypeKey::Single(dtype), entry.positional).is_some(),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Typed view for one or two input types
    ///
    /// Parameterized operators are curried with their default parameters.
    pub fn resolve(&self, id: OpId, dtypes: &[DType]) -> Result<TypedOp> {
        let key = TypeKey::from_slice(dtypes)
            .ok_or_else(|| Error::invalid_value("expected one or two dtypes"))?;
        self.resolve_key(id, key)
    }

    /// Typed view for a type key
    pub fn resolve_key(&self, id: OpId, key: TypeKey) -> Result<TypedOp> {
        let parameterized = self.state.read().entry(id)?.is_parameterized();
        let id = if parameterized {
            self.curry(id, &Params::new())?
        } else {
            id
        };
        let st = self.state.read();
        let typed = st.resolve(id, key, false)?;
        if typed.coerced {
            log::debug!("{} coerced {} to {}", typed.name(), typed.requested, typed.key);
            self.coercions
                .lock()
                .entry(id)
                .or_default()
                .insert(typed.requested, typed.key);
        }
        Ok(typed)
    }

    /// Typed view only if `key` is declared natively
    pub fn resolve_exact(&self, id: OpId, key: TypeKey) -> Result<Option<TypedOp>> {
        let st = self.state.read();
        match st.resolve(id, key, true) {
            Ok(t) => Ok(Some(t)),
            Err(Error::NoMatchingKernel { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn expect_kind(entry: &OpEntry, kind: OpKind) -> Result<()> {
    if entry.kind == kind {
        Ok(())
    } else {
        Err(Error::invalid_type(format!(
            "Expected type: {}, got {} {}",
            kind.type_name(),
            entry.kind.type_name(),
            entry.name
        )))
    }
}

fn check_signatures(a: &OpEntry, b: &OpEntry) -> Result<()> {
    match (a.signature(), b.signature()) {
        (None, None) => Ok(()),
        (Some(x), Some(y)) if x == y => Ok(()),
        (x, y) => Err(Error::SignatureMismatch {
            left: a.name.clone(),
            right: b.name.clone(),
            left_sig: x.map(|s| s.to_string()).unwrap_or_else(|| "not parameterized".into()),
            right_sig: y.map(|s| s.to_string()).unwrap_or_else(|| "not parameterized".into()),
        }),
    }
}

/// Declared key serving `req`, and whether it was coerced
fn find_key(
    kernels: &BTreeMap<TypeKey, KernelHandle>,
    req: TypeKey,
    positional: bool,
) -> Option<(TypeKey, bool)> {
    if kernels.contains_key(&req) {
        return Some((req, false));
    }
    if positional {
        // Positional kernels ignore input values; any input maps to INT64
        let fallback = TypeKey::Single(DType::I64);
        return if kernels.contains_key(&fallback) {
            Some((fallback, true))
        } else {
            kernels.keys().next().map(|k| (*k, true))
        };
    }
    if let TypeKey::Single(dt) = req {
        let singles: DTypeSet = kernels
            .keys()
            .filter_map(|k| match k {
                TypeKey::Single(d) => Some(*d),
                TypeKey::Pair(..) => None,
            })
            .collect();
        if let Some(target) = coercion_target(dt, singles) {
            return Some((TypeKey::Single(target), true));
        }
    }
    kernels
        .keys()
        .filter(|k| can_cast_safely(req.left(), k.left()) && can_cast_safely(req.right(), k.right()))
        .min_by_key(|k| (k.left().rank().max(k.right().rank()), k.left().rank() + k.right().rank()))
        .map(|k| (*k, true))
}

impl State {
    fn entry(&self, id: OpId) -> Result<&OpEntry> {
        self.ops
            .get(id.index())
            .ok_or_else(|| Error::invalid_value(format!("unknown operator id {}", id.0)))
    }

    /// Fail unless `path` is free for a new `kind` operator
    ///
    /// Kinds sharing the combined `op` lookup may only reuse a name when the
    /// new monoid or semiring is built from the operator already holding it.
    fn check_name(&self, kind: OpKind, path: &str, definition: Option<&Definition>) -> Result<()> {
        let duplicate = |existing: OpKind| Error::DuplicateName {
            path: path.to_string(),
            existing: existing.name(),
            requested: kind.name(),
        };
        if self.roots[kind.index()].check_insert(path)?.is_some() {
            return Err(duplicate(kind));
        }
        if !OpKind::COMBINED.contains(&kind) {
            return Ok(());
        }
        for other in OpKind::COMBINED {
            if other == kind {
                continue;
            }
            let Some(existing) = self.roots[other.index()].get(path) else {
                continue;
            };
            let compatible = match (definition, other) {
                (Some(Definition::Monoid { binaryop, .. }), OpKind::Binary) => *binaryop == existing,
                (Some(Definition::Semiring { binaryop, .. }), OpKind::Binary) => *binaryop == existing,
                (Some(Definition::Semiring { monoid, .. }), OpKind::Monoid) => *monoid == existing,
                _ => false,
            };
            if !compatible {
                return Err(duplicate(other));
            }
        }
        Ok(())
    }

    fn push(&mut self, entry: OpEntry) -> OpId {
        let id = OpId(self.ops.len() as u32);
        self.ops.push(entry);
        id
    }

    fn set_commute(&mut self, a: OpId, b: OpId) {
        self.ops[a.index()].commutes_to = Some(b);
        self.ops[b.index()].commutes_to = Some(a);
    }

    /// Link two operators as commutes unless either is already linked
    fn try_commute(&mut self, a: OpId, b: OpId) {
        if self.ops[a.index()].commutes_to.is_none() && self.ops[b.index()].commutes_to.is_none() {
            self.set_commute(a, b);
        }
    }

    fn clear_memo(&mut self, id: OpId) {
        if let Body::Parameterized(p) = &mut self.ops[id.index()].body {
            p.memo.clear();
        }
    }

    fn memo(&self, id: OpId, bound: &[Value]) -> Option<OpId> {
        match &self.ops[id.index()].body {
            Body::Parameterized(p) => p.memo.get(bound).copied(),
            _ => None,
        }
    }

    fn remember(&mut self, id: OpId, bound: Vec<Value>, instance: OpId) {
        if let Body::Parameterized(p) = &mut self.ops[id.index()].body {
            p.memo.insert(bound, instance);
        }
    }

    /// Validate a definition and build its entry without touching the registry
    fn build_entry(&self, name: &str, anonymous: bool, def: Definition) -> Result<OpEntry> {
        let kind = def.kind();
        match def {
            Definition::Unary(d)
            | Definition::Binary(d)
            | Definition::IndexUnary(d)
            | Definition::Select(d) => {
                let kernels = d.validate(name, kind)?;
                let mut e = OpEntry::new(
                    name,
                    kind,
                    anonymous,
                    Body::Concrete(Concrete {
                        kernels,
                        identities: BTreeMap::new(),
                    }),
                );
                e.positional = d.is_positional();
                Ok(e)
            }
            Definition::Parameterized { kind, signature, factory } => {
                if kind.is_binary_like() && kind != OpKind::Binary {
                    return Err(Error::invalid_type(format!(
                        "a parameterized {} is built from its parts, not a kernel factory",
                        kind.type_name()
                    )));
                }
                Ok(OpEntry::new(
                    name,
                    kind,
                    anonymous,
                    Body::Parameterized(Parameterized {
                        signature,
                        source: ParamSource::Kernels(factory),
                        memo: HashMap::new(),
                    }),
                ))
            }
            Definition::Monoid { binaryop, identity, idempotent } => {
                let b = self.entry(binaryop)?;
                expect_kind(b, OpKind::Binary)?;
                let body = match &b.body {
                    Body::Reserved => return Err(Error::UnboundOperator { name: b.name.clone() }),
                    Body::Parameterized(p) => {
                        if let Identity::Parameterized(sig, _) = &identity {
                            if *sig != p.signature {
                                return Err(Error::SignatureMismatch {
                                    left: b.name.clone(),
                                    right: name.to_string(),
                                    left_sig: p.signature.to_string(),
                                    right_sig: sig.to_string(),
                                });
                            }
                        }
                        Body::Parameterized(Parameterized {
                            signature: p.signature.clone(),
                            source: ParamSource::Monoid(identity),
                            memo: HashMap::new(),
                        })
                    }
                    Body::Concrete(c) => {
                        if matches!(identity, Identity::Parameterized(..)) {
                            return Err(Error::invalid_type(format!(
                                "binaryop must be parameterized to use a parameterized identity; {} is not",
                                b.name
                            )));
                        }
                        Body::Concrete(monoid_table(name, &b.name, c, &identity)?)
                    }
                };
                let mut e = OpEntry::new(name, OpKind::Monoid, anonymous, body);
                e.binaryop = Some(binaryop);
                e.idempotent = idempotent;
                e.positional = b.positional;
                Ok(e)
            }
            Definition::Semiring { monoid, binaryop } => {
                let (m, b) = (self.entry(monoid)?, self.entry(binaryop)?);
                expect_kind(m, OpKind::Monoid)?;
                expect_kind(b, OpKind::Binary)?;
                let body = match (&m.body, &b.body) {
                    (Body::Reserved, _) => {
                        return Err(Error::UnboundOperator { name: m.name.clone() })
                    }
                    (_, Body::Reserved) => {
                        return Err(Error::UnboundOperator { name: b.name.clone() })
                    }
                    (Body::Concrete(mc), Body::Concrete(bc)) => Body::Concrete(Concrete {
                        kernels: semiring_table(name, mc, bc)?,
                        identities: BTreeMap::new(),
                    }),
                    _ => {
                        if m.is_parameterized() && b.is_parameterized() {
                            check_signatures(m, b)?;
                        }
                        let signature = m.signature().or(b.signature()).cloned().unwrap_or_default();
                        Body::Parameterized(Parameterized {
                            signature,
                            source: ParamSource::Semiring,
                            memo: HashMap::new(),
                        })
                    }
                };
                let mut e = OpEntry::new(name, OpKind::Semiring, anonymous, body);
                e.monoid = Some(monoid);
                e.binaryop = Some(binaryop);
                e.positional = b.positional;
                Ok(e)
            }
        }
    }

    /// Links implied by a freshly pushed entry; never fails
    fn link_new(&mut self, id: OpId) {
        let e = &self.ops[id.index()];
        match e.kind {
            OpKind::Monoid => {
                let Some(b) = e.binaryop else { return };
                if self.ops[b.index()].monoid.is_none() {
                    self.ops[b.index()].monoid = Some(id);
                    self.clear_memo(b);
                }
                if self.ops[b.index()].commutes_to == Some(b) {
                    self.ops[id.index()].commutes_to = Some(id);
                }
            }
            OpKind::Semiring => {
                let (Some(m), Some(b)) = (e.monoid, e.binaryop) else { return };
                self.semirings.entry((m, b)).or_insert(id);
                let commute = self.ops[b.index()].commutes_to;
                match commute {
                    Some(c) if c == b => self.ops[id.index()].commutes_to = Some(id),
                    Some(c) => {
                        if let Some(&other) = self.semirings.get(&(m, c)) {
                            if other != id {
                                self.try_commute(id, other);
                            }
                        }
                    }
                    None => {}
                }
            }
            _ => {}
        }
    }

    fn instance_name(&self, id: OpId, bound: &[Value]) -> String {
        let e = &self.ops[id.index()];
        let rendered = e.signature().map(|s| s.render(bound)).unwrap_or_default();
        format!("{}({rendered})", e.name)
    }

    fn curry_bound(&mut self, id: OpId, bound: Vec<Value>) -> Result<OpId> {
        if let Some(instance) = self.memo(id, &bound) {
            return Ok(instance);
        }
        log::debug!("currying {}", self.instance_name(id, &bound));
        let source = match &self.ops[id.index()].body {
            Body::Parameterized(p) => p.source.clone(),
            _ => return Ok(id),
        };
        match source {
            ParamSource::Kernels(_) => {
                let e = &self.ops[id.index()];
                if let (OpKind::Binary, Some(m)) = (e.kind, e.monoid) {
                    if self.ops[m.index()].is_parameterized() {
                        match self.curry_bound(m, bound.clone()) {
                            Ok(mi) => {
                                if let Some(b) = self.ops[mi.index()].binaryop {
                                    return Ok(b);
                                }
                            }
                            Err(err) => {
                                log::debug!(
                                    "{} has no monoid for these parameters: {err}",
                                    self.instance_name(id, &bound)
                                );
                            }
                        }
                    }
                }
                self.build_instance(id, bound, true)
            }
            ParamSource::Monoid(identity) => {
                let identity = match identity {
                    Identity::Parameterized(_, f) => Identity::Value(f(&bound)?),
                    other => other,
                };
                let Some(b) = self.ops[id.index()].binaryop else {
                    return Err(Error::UnboundOperator { name: self.ops[id.index()].name.clone() });
                };
                let name = self.instance_name(id, &bound);
                let bi = if self.ops[b.index()].is_parameterized() {
                    match self.memo(b, &bound) {
                        Some(bi) => bi,
                        None => self.build_instance(b, bound.clone(), true)?,
                    }
                } else {
                    b
                };
                let be = &self.ops[bi.index()];
                let table = monoid_table(&name, &be.name, be.concrete()?, &identity)?;
                let mut e = OpEntry::new(&name, OpKind::Monoid, true, Body::Concrete(table));
                e.binaryop = Some(bi);
                e.idempotent = self.ops[id.index()].idempotent;
                e.positional = be.positional;
                e.parent = Some(id);
                let mi = self.push(e);
                self.remember(id, bound, mi);
                self.link_new(mi);
                Ok(mi)
            }
            ParamSource::Semiring => {
                let e = &self.ops[id.index()];
                let (Some(m), Some(b)) = (e.monoid, e.binaryop) else {
                    return Err(Error::UnboundOperator { name: e.name.clone() });
                };
                let name = self.instance_name(id, &bound);
                let mi = self.curry_bound(m, bound.clone())?;
                let bi = self.curry_bound(b, bound.clone())?;
                let kernels = semiring_table(
                    &name,
                    self.ops[mi.index()].concrete()?,
                    self.ops[bi.index()].concrete()?,
                )?;
                let mut e = OpEntry::new(
                    &name,
                    OpKind::Semiring,
                    true,
                    Body::Concrete(Concrete {
                        kernels,
                        identities: BTreeMap::new(),
                    }),
                );
                e.monoid = Some(mi);
                e.binaryop = Some(bi);
                e.positional = self.ops[bi.index()].positional;
                e.parent = Some(id);
                let si = self.push(e);
                self.remember(id, bound, si);
                self.link_new(si);
                Ok(si)
            }
        }
    }

    /// Build a concrete instance of a kernel-factory operator
    fn build_instance(&mut self, id: OpId, bound: Vec<Value>, link_commute: bool) -> Result<OpId> {
        let (kind, factory) = match &self.ops[id.index()].body {
            Body::Parameterized(Parameterized {
                source: ParamSource::Kernels(f),
                ..
            }) => (self.ops[id.index()].kind, f.clone()),
            _ => return Err(Error::invalid_type(format!("{} has no kernel factory", self.ops[id.index()].name))),
        };
        let name = self.instance_name(id, &bound);
        let def = factory(&bound)?;
        let kernels = def.validate(&name, kind)?;
        let mut e = OpEntry::new(
            &name,
            kind,
            true,
            Body::Concrete(Concrete {
                kernels,
                identities: BTreeMap::new(),
            }),
        );
        e.positional = def.is_positional();
        e.parent = Some(id);
        let instance = self.push(e);
        self.remember(id, bound.clone(), instance);

        if link_commute {
            let commute = self.ops[id.index()].commutes_to;
            match commute {
                Some(c) if c == id => self.ops[instance.index()].commutes_to = Some(instance),
                Some(c) if self.ops[c.index()].is_parameterized() => {
                    let other = match self.memo(c, &bound) {
                        Some(o) => o,
                        None => self.build_instance(c, bound, false)?,
                    };
                    self.try_commute(instance, other);
                }
                _ => {}
            }
        }
        Ok(instance)
    }

    fn resolve(&self, id: OpId, req: TypeKey, exact: bool) -> Result<TypedOp> {
        let e = self.entry(id)?;
        let c = e.concrete()?;
        let no_match = || Error::no_matching_kernel(&e.name, req);
        let (key, coerced) = if exact {
            c.kernels.contains_key(&req).then_some((req, false)).ok_or_else(no_match)?
        } else {
            find_key(&c.kernels, req, e.positional).ok_or_else(no_match)?
        };
        let kernel = c.kernels.get(&key).cloned().ok_or_else(no_match)?;
        let mut typed = TypedOp {
            op: id,
            name: e.name.clone(),
            kind: e.kind,
            requested: req,
            key,
            coerced,
            kernel,
            identity: None,
            add: None,
            positional: e.positional,
        };
        match e.kind {
            OpKind::Monoid => {
                typed.identity = c.identities.get(&key.left()).copied();
            }
            OpKind::Semiring => {
                let monoid = e.monoid.ok_or_else(|| Error::UnboundOperator { name: e.name.clone() })?;
                let add = self.resolve(monoid, TypeKey::Single(typed.kernel.output()), true)?;
                typed.add = Some(AddPart {
                    monoid,
                    identity: add.identity.unwrap_or_else(|| Value::zero(add.return_type())),
                    kernel: add.kernel,
                });
            }
            _ => {}
        }
        Ok(typed)
    }
}

fn monoid_table(name: &str, binary: &str, b: &Concrete, identity: &Identity) -> Result<Concrete> {
    let mut kernels = BTreeMap::new();
    let mut identities = BTreeMap::new();
    match identity {
        Identity::Value(v) => {
            for (key, k) in &b.kernels {
                if let TypeKey::Single(dt) = *key {
                    if k.output() == dt && v.fits(dt) {
                        kernels.insert(*key, k.clone());
                        identities.insert(dt, v.cast(dt));
                    }
                }
            }
            if kernels.is_empty() {
                return Err(Error::DomainMismatch {
                    op: name.to_string(),
                    reason: format!("identity {v} fits none of the types of {binary}"),
                });
            }
        }
        Identity::PerType(map) => {
            for (dt, v) in map {
                let key = TypeKey::Single(*dt);
                let k = b.kernels.get(&key).ok_or_else(|| Error::DomainMismatch {
                    op: name.to_string(),
                    reason: format!("{dt} is not in the domain of {binary}"),
                })?;
                if k.output() != *dt {
                    return Err(Error::DomainMismatch {
                        op: name.to_string(),
                        reason: format!("{binary} returns {} for {dt} inputs", k.output()),
                    });
                }
                if !v.fits(*dt) {
                    return Err(Error::DomainMismatch {
                        op: name.to_string(),
                        reason: format!("identity {v} is not a valid {dt}"),
                    });
                }
                kernels.insert(key, k.clone());
                identities.insert(*dt, v.cast(*dt));
            }
            if kernels.is_empty() {
                return Err(Error::DomainMismatch {
                    op: name.to_string(),
                    reason: "no identities given".to_string(),
                });
            }
        }
        Identity::Parameterized(..) => {
            return Err(Error::invalid_type(format!(
                "{name}: a parameterized identity needs parameters"
            )))
        }
    }
    Ok(Concrete { kernels, identities })
}

fn semiring_table(
    name: &str,
    monoid: &Concrete,
    binary: &Concrete,
) -> Result<BTreeMap<TypeKey, KernelHandle>> {
    let kernels: BTreeMap<TypeKey, KernelHandle> = binary
        .kernels
        .iter()
        .filter(|(_, k)| monoid.kernels.contains_key(&TypeKey::Single(k.output())))
        .map(|(key, k)| (*key, k.clone()))
        .collect();
    if kernels.is_empty() {
        return Err(Error::DomainMismatch {
            op: name.to_string(),
            reason: "the binary operator produces no type the monoid supports".to_string(),
        });
    }
    Ok(kernels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::definition::OpDefinition;
    use crate::ops::kernel::KernelHandle;

    fn int_plus() -> OpDefinition {
        let mut def = OpDefinition::new();
        for dt in [DType::I32, DType::I64, DType::F64] {
            def = def.kernel(KernelHandle::binary(format!("plus_{dt}"), dt, dt, |a, b| match (a, b) {
                (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
                (a, b) => Value::Float(a.to_f64() + b.to_f64()),
            }));
        }
        def
    }

    #[test]
    fn test_resolve_exact_and_coerced() {
        let reg = Registry::new();
        let plus = reg.register("plus", Definition::Binary(int_plus())).unwrap();

        let t = reg.resolve(plus, &[DType::I64]).unwrap();
        assert!(!t.is_coerced());
        assert_eq!(t.return_type(), DType::I64);

        let t = reg.resolve(plus, &[DType::I8]).unwrap();
        assert!(t.is_coerced());
        assert_eq!(t.type_key(), TypeKey::Single(DType::I32));
        assert_eq!(
            reg.coercions(plus).get(&TypeKey::Single(DType::I8)),
            Some(&TypeKey::Single(DType::I32))
        );
        assert!(reg.types(plus).unwrap().contains(&TypeKey::Single(DType::I8)));
        assert_eq!(reg.native_types(plus).unwrap().len(), 3);

        let err = reg.resolve(plus, &[DType::Complex64]).unwrap_err();
        assert!(matches!(err, Error::NoMatchingKernel { .. }));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let reg = Registry::new();
        let plus = reg.register("plus", Definition::Binary(int_plus())).unwrap();
        let a = reg.resolve(plus, &[DType::I16]).unwrap();
        let b = reg.resolve(plus, &[DType::I16]).unwrap();
        assert_eq!(a.kernel(), b.kernel());
    }

    #[test]
    fn test_contains_does_not_record() {
        let reg = Registry::new();
        let plus = reg.register("plus", Definition::Binary(int_plus())).unwrap();
        assert!(reg.contains(plus, DType::U8));
        assert!(!reg.contains(plus, DType::Complex128));
        assert!(reg.coercions(plus).is_empty());
    }

    #[test]
    fn test_mixed_pair_resolution() {
        let reg = Registry::new();
        let plus = reg.register("plus", Definition::Binary(int_plus())).unwrap();
        let t = reg.resolve(plus, &[DType::I32, DType::F32]).unwrap();
        assert_eq!(t.type_key(), TypeKey::Single(DType::F64));
    }

    #[test]
    fn test_reserved_is_unbound_until_bound() {
        let reg = Registry::new();
        let id = reg.reserve(OpKind::Binary, "lazy.plus").unwrap();
        let err = reg.resolve(id, &[DType::I64]).unwrap_err();
        assert!(matches!(err, Error::UnboundOperator { .. }));

        let err = reg
            .bind(id, Definition::Unary(OpDefinition::new()))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));

        reg.bind(id, Definition::Binary(int_plus())).unwrap();
        assert!(reg.resolve(id, &[DType::I64]).is_ok());
        assert!(reg.bind(id, Definition::Binary(int_plus())).is_err());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let reg = Registry::new();
        let plus = reg.register("foo", Definition::Binary(int_plus())).unwrap();
        let err = reg.register("foo", Definition::Binary(int_plus())).unwrap_err();
        assert!(matches!(err, Error::DuplicateName { existing: "binary", .. }), "{err}");
        assert!(matches!(
            reg.reserve(OpKind::Binary, "foo"),
            Err(Error::DuplicateName { .. })
        ));

        // a unary op would shadow the binary one in the combined lookup
        let neg = OpDefinition::new().kernel(KernelHandle::unary("neg", DType::I64, DType::I64, |v| v));
        let err = reg.register("foo", Definition::Unary(neg)).unwrap_err();
        assert!(
            matches!(err, Error::DuplicateName { existing: "binary", requested: "unary", .. }),
            "{err}"
        );
        assert_eq!(reg.lookup_any("foo").unwrap(), plus);

        let monoid = Definition::Monoid {
            binaryop: plus,
            identity: Identity::per_type([(DType::I64, 0i64)]),
            idempotent: false,
        };
        let m = reg.register("foo", monoid).unwrap();
        let s = reg.register("foo", Definition::Semiring { monoid: m, binaryop: plus }).unwrap();
        assert_eq!(reg.lookup(OpKind::Semiring, "foo").unwrap(), s);

        let other = reg.register("bar", Definition::Binary(int_plus())).unwrap();
        let err = reg
            .register(
                "foo.baz",
                Definition::Monoid {
                    binaryop: other,
                    identity: Identity::per_type([(DType::I64, 0i64)]),
                    idempotent: false,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::PathConflict { .. }), "{err}");
        let err = reg
            .register(
                "bar",
                Definition::Semiring { monoid: m, binaryop: plus },
            )
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { existing: "binary", .. }), "{err}");
    }

    #[test]
    fn test_failed_registration_changes_nothing() {
        let reg = Registry::new();
        let plus = reg.register("plus", Definition::Binary(int_plus())).unwrap();
        let before = reg.len();
        let err = reg
            .register(
                "plus_monoid",
                Definition::Monoid {
                    binaryop: plus,
                    identity: Identity::per_type([(DType::U8, 0u8)]),
                    idempotent: false,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::DomainMismatch { .. }));
        assert_eq!(reg.len(), before);
        assert!(reg.lookup(OpKind::Monoid, "plus_monoid").is_err());
        assert_eq!(reg.monoid_of(plus).unwrap(), None);
    }

    #[test]
    fn test_commute_conflict() {
        let reg = Registry::new();
        let a = reg.register("a", Definition::Binary(int_plus())).unwrap();
        let b = reg.register("b", Definition::Binary(int_plus())).unwrap();
        let c = reg.register("c", Definition::Binary(int_plus())).unwrap();
        reg.link_commute(a, b).unwrap();
        assert_eq!(reg.commutes_to(b).unwrap(), Some(a));
        let err = reg.link_commute(a, c).unwrap_err();
        assert!(matches!(err, Error::CommuteConflict { .. }));
        assert_eq!(reg.commutes_to(c).unwrap(), None);
    }
}
