//! Constraints: the cross-cutting layer over the four expression kinds
//! (spec.md §3, "Constraint").

use std::fmt;
use std::sync::Arc;

use super::boolean::BoolExpr;
use super::num::NumExpr;
use super::shape::ShapeExpr;
use super::string::StringExpr;
use crate::id::IdManager;
use crate::loc::SourceLoc;
use crate::symbol::Symbol;

/// One operand of `Eq`/`NotEq`, tagged by result-kind so that comparing
/// operands of different kinds can be rejected outright (spec.md §4.D).
#[derive(Debug, Clone)]
pub enum Operand {
    /// A numeric operand.
    Num(Arc<NumExpr>),
    /// A boolean operand.
    Bool(Arc<BoolExpr>),
    /// A shape operand.
    Shape(Arc<ShapeExpr>),
    /// A string operand.
    String(Arc<StringExpr>),
}

impl Operand {
    /// A short tag naming this operand's kind, for error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Num(_) => "num",
            Self::Bool(_) => "bool",
            Self::Shape(_) => "shape",
            Self::String(_) => "string",
        }
    }

    pub(crate) fn free_symbols(&self, out: &mut Vec<Symbol>) {
        match self {
            Self::Num(e) => e.free_symbols(out),
            Self::Bool(e) => e.free_symbols(out),
            Self::Shape(e) => e.free_symbols(out),
            Self::String(e) => e.free_symbols(out),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(e) => write!(f, "{e}"),
            Self::Bool(e) => write!(f, "{e}"),
            Self::Shape(e) => write!(f, "{e}"),
            Self::String(e) => write!(f, "{e}"),
        }
    }
}

/// The variant data of a [`Constraint`] (spec.md §3).
#[derive(Debug, Clone)]
pub enum ConstraintKind {
    /// A boolean expression lifted into constraint position.
    ExpBool(Arc<BoolExpr>),
    /// `l == r`, for operands of the same kind.
    Eq(Operand, Operand),
    /// `l != r`, for operands of the same kind.
    NotEq(Operand, Operand),
    /// `l < r` (numeric).
    Lt(Arc<NumExpr>, Arc<NumExpr>),
    /// `l <= r` (numeric).
    Le(Arc<NumExpr>, Arc<NumExpr>),
    /// `l && r`.
    And(Arc<Constraint>, Arc<Constraint>),
    /// `l || r`.
    Or(Arc<Constraint>, Arc<Constraint>),
    /// `!c`.
    Not(Arc<Constraint>),
    /// NumPy/PyTorch broadcast compatibility of two shapes.
    Broadcastable(Arc<ShapeExpr>, Arc<ShapeExpr>),
    /// `forall sym in [lo, hi]. body`.
    Forall {
        /// The bound variable.
        symbol: Symbol,
        /// Inclusive lower bound of the quantified range.
        lo: Arc<NumExpr>,
        /// Inclusive upper bound of the quantified range.
        hi: Arc<NumExpr>,
        /// The quantified body.
        body: Arc<Constraint>,
    },
    /// An explicit, unconditional failure.
    Fail(Arc<str>),
}

/// `{id: nat, source?, ...}` — spec.md §3. Constraint IDs are minted from the
/// same [`IdManager`] as symbols but are a distinct namespace.
#[derive(Debug, Clone)]
pub struct Constraint {
    id: u64,
    source: Option<SourceLoc>,
    kind: ConstraintKind,
    ids: IdManager,
}

impl Constraint {
    /// Build a constraint from a variant, minting a fresh ID. This is a pure
    /// factory: the returned constraint is not installed into any snapshot
    /// (spec.md §4.E).
    pub(crate) fn new(mgr: &IdManager, kind: ConstraintKind, source: Option<SourceLoc>) -> Self {
        Self {
            id: mgr.next_ctr_id(),
            source,
            kind,
            ids: mgr.clone(),
        }
    }

    /// The constraint's unique ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The id-manager that minted this constraint, used by
    /// [`crate::constraints::ConstraintSet::install`] to check that a
    /// constraint is not being installed into a snapshot forked from a
    /// different root (see [`IdManager::same_manager_as`]).
    pub(crate) const fn ids(&self) -> &IdManager {
        &self.ids
    }

    /// The source location this constraint was constructed at, if any.
    #[must_use]
    pub fn source(&self) -> Option<&SourceLoc> {
        self.source.as_ref()
    }

    /// The constraint's variant data.
    #[must_use]
    pub const fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Wrap `self` for use as a child node.
    #[must_use]
    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Rebuild this constraint with a different `kind`, keeping the same ID
    /// and source location — used by the simplifier to produce a simplified
    /// *view* of an already-installed constraint, not a new one.
    #[must_use]
    pub(crate) fn with_kind(&self, kind: ConstraintKind) -> Self {
        Self {
            id: self.id,
            source: self.source.clone(),
            kind,
            ids: self.ids.clone(),
        }
    }

    /// Collect the IDs of every symbol free in this constraint.
    #[must_use]
    pub fn free_symbols(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        self.collect_free_symbols(&mut out);
        out
    }

    fn collect_free_symbols(&self, out: &mut Vec<Symbol>) {
        match &self.kind {
            ConstraintKind::ExpBool(e) => e.free_symbols(out),
            ConstraintKind::Eq(l, r) | ConstraintKind::NotEq(l, r) => {
                l.free_symbols(out);
                r.free_symbols(out);
            }
            ConstraintKind::Lt(l, r) | ConstraintKind::Le(l, r) => {
                l.free_symbols(out);
                r.free_symbols(out);
            }
            ConstraintKind::And(l, r) | ConstraintKind::Or(l, r) => {
                l.collect_free_symbols(out);
                r.collect_free_symbols(out);
            }
            ConstraintKind::Not(c) => c.collect_free_symbols(out),
            ConstraintKind::Broadcastable(l, r) => {
                l.free_symbols(out);
                r.free_symbols(out);
            }
            ConstraintKind::Forall { symbol, lo, hi, body } => {
                out.push(symbol.clone());
                lo.free_symbols(out);
                hi.free_symbols(out);
                body.collect_free_symbols(out);
            }
            ConstraintKind::Fail(_) => {}
        }
    }

    /// "This constraint mentions exactly one symbol" — spec.md §4.A
    /// (`hasSingleVar`). Returns the lone symbol, or `None` if it mentions
    /// zero or more than one.
    #[must_use]
    pub fn single_var(&self) -> Option<Symbol> {
        let mut seen: Vec<Symbol> = Vec::new();
        for s in self.free_symbols() {
            if !seen.contains(&s) {
                seen.push(s);
            }
            if seen.len() > 1 {
                return None;
            }
        }
        seen.into_iter().next()
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Constraint {}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpBool(e) => write!(f, "{e}"),
            Self::Eq(l, r) => write!(f, "({l} == {r})"),
            Self::NotEq(l, r) => write!(f, "({l} != {r})"),
            Self::Lt(l, r) => write!(f, "({l} < {r})"),
            Self::Le(l, r) => write!(f, "({l} <= {r})"),
            Self::And(l, r) => write!(f, "({} && {})", l.kind(), r.kind()),
            Self::Or(l, r) => write!(f, "({} || {})", l.kind(), r.kind()),
            Self::Not(c) => write!(f, "!({})", c.kind()),
            Self::Broadcastable(l, r) => write!(f, "broadcastable({l}, {r})"),
            Self::Forall { symbol, lo, hi, body } => {
                write!(f, "forall {symbol} in [{lo}, {hi}]. {}", body.kind())
            }
            Self::Fail(reason) => write!(f, "fail({reason})"),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}
